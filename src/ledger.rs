use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::entropy::sha256_hex;

/// Per-round ticket ledger: wallet address (lowercase hex) → ticket count.
///
/// Backed by an ordered map so that the canonical serialization is a property
/// of the final wallet→count values, never of insertion order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketLedger(BTreeMap<String, u64>);

impl TicketLedger {
    /// Add tickets for a wallet; only called while the owning round is open
    pub fn credit(&mut self, wallet: &str, tickets: u64) {
        *self.0.entry(wallet.to_string()).or_insert(0) += tickets;
    }

    /// Sum of all ticket counts
    pub fn total(&self) -> u64 {
        self.0.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(|&c| c == 0)
    }

    /// Sorted `(wallet, count)` pairs with zero counts dropped
    pub fn snapshot(&self) -> Vec<(&str, u64)> {
        self.0
            .iter()
            .filter(|(_, &c)| c > 0)
            .map(|(w, &c)| (w.as_str(), c))
            .collect()
    }

    /// Canonical CSV: a `wallet,tickets` header plus one line per entry,
    /// wallets ascending. This exact byte sequence is what gets hashed.
    pub fn to_csv(&self) -> String {
        let mut csv = String::from("wallet,tickets");
        for (wallet, count) in self.snapshot() {
            csv.push('\n');
            csv.push_str(wallet);
            csv.push(',');
            csv.push_str(&count.to_string());
        }
        csv
    }

    /// SHA-256 hex digest of the canonical CSV
    pub fn snapshot_hash(&self) -> String {
        sha256_hex(self.to_csv().as_bytes())
    }

    /// Flat entry list for a weighted draw: each wallet repeated by its
    /// ticket count, in snapshot order
    pub fn entries(&self) -> Vec<&str> {
        let mut out = Vec::with_capacity(self.total() as usize);
        for (wallet, count) in self.snapshot() {
            for _ in 0..count {
                out.push(wallet);
            }
        }
        out
    }

    /// Distinct entrant wallets in ascending order (for unweighted draws)
    pub fn wallets(&self) -> Vec<&str> {
        self.snapshot().into_iter().map(|(w, _)| w).collect()
    }

    /// Canonical entrant-list serialization for the jackpot snapshot:
    /// a `wallet` header plus one wallet per line
    pub fn entrants_csv(&self) -> String {
        let mut csv = String::from("wallet");
        for wallet in self.wallets() {
            csv.push('\n');
            csv.push_str(wallet);
        }
        csv
    }

    pub fn entrants_hash(&self) -> String {
        sha256_hex(self.entrants_csv().as_bytes())
    }
}
