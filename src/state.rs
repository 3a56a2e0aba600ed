use std::collections::BTreeMap;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

use crate::ledger::TicketLedger;

/// Kind of a prize round
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundKind {
    /// Ticket-weighted draw over transfers to the collection wallet
    Raffle,
    /// Unweighted draw over the raffle entrants, paid from the skimmed pot
    Jackpot,
}

impl fmt::Display for RoundKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundKind::Raffle => f.write_str("raffle"),
            RoundKind::Jackpot => f.write_str("jackpot"),
        }
    }
}

/// One raffle or jackpot round.
///
/// While `closed` is false, `end_block` is 0 and the commit fields are unset.
/// Once closed, `ticket_price`, `snapshot_hash` and `salt_commit` never change;
/// `winner` is set exactly once, at pick time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Round {
    pub id: String,
    pub kind: RoundKind,
    /// Creation time, unix milliseconds
    pub started_at: u64,
    /// Base token-units per ticket; fixed at creation, raffle rounds only
    #[serde(
        with = "u256_dec_opt",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub ticket_price: Option<U256>,
    pub closed: bool,
    /// Block whose hash seeds the draw; 0 until closed
    pub end_block: u64,
    pub snapshot_hash: Option<String>,
    pub salt_commit: Option<String>,
    pub salt_reveal: Option<String>,
    pub entropy: Option<String>,
    pub winner: Option<String>,
}

impl Round {
    pub fn new(id: String, kind: RoundKind, ticket_price: Option<U256>) -> Self {
        Round {
            id,
            kind,
            started_at: now_ms(),
            ticket_price,
            closed: false,
            end_block: 0,
            snapshot_hash: None,
            salt_commit: None,
            salt_reveal: None,
            entropy: None,
            winner: None,
        }
    }

    pub fn picked(&self) -> bool {
        self.winner.is_some()
    }
}

/// Running jackpot accounting: the skimmed pot plus the active round, if any
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct JackpotState {
    /// Raw token-units, persisted as a decimal string
    #[serde(with = "u256_dec", default)]
    pub pot: U256,
    pub current: Option<Round>,
}

/// Cumulative per-wallet counters; increments only, never deleted
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletStats {
    pub tickets: u64,
    pub wins: u64,
    pub xp: u64,
}

/// The whole persisted document.
///
/// Every feature reads and writes through this one value; the store writes it
/// atomically, so a ledger mutation and the cursor that covers it land
/// together or not at all.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Last block fully processed by the ticket scanner
    #[serde(default)]
    pub cursor: u64,
    /// Current raffle round; superseded rounds keep their ledgers in `tickets`
    #[serde(default)]
    pub raffle: Option<Round>,
    /// Per-round ticket ledgers, keyed by round id
    #[serde(default)]
    pub tickets: BTreeMap<String, TicketLedger>,
    #[serde(default)]
    pub jackpot: JackpotState,
    /// Per-wallet cumulative stats, keyed by lowercase address
    #[serde(default)]
    pub stats: BTreeMap<String, WalletStats>,
    /// Transaction hashes the pool watcher has already alerted on,
    /// mapped to first-seen unix milliseconds
    #[serde(default)]
    pub seen_tx: BTreeMap<String, u64>,
}

impl Document {
    /// Ledger of the given round, creating it if absent
    pub fn ledger_mut(&mut self, round_id: &str) -> &mut TicketLedger {
        self.tickets.entry(round_id.to_string()).or_default()
    }

    pub fn wallet_stats_mut(&mut self, wallet: &str) -> &mut WalletStats {
        self.stats.entry(wallet.to_string()).or_default()
    }
}

/// Canonical ledger/stats key for an address: lowercase `0x…` hex
pub fn addr_key(addr: &alloy_primitives::Address) -> String {
    format!("0x{}", hex::encode(addr))
}

/// Canonical dedup key for a transaction hash
pub fn tx_key(hash: &alloy_primitives::B256) -> String {
    format!("0x{}", hex::encode(hash))
}

pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// 10^18, one whole token in base units
pub fn one_token() -> U256 {
    U256::from(10u64).pow(U256::from(18u64))
}

/// Whole-token rendering of a raw base-unit amount (remainder dropped)
pub fn fmt_tokens(raw: U256) -> String {
    (raw / one_token()).to_string()
}

/// Serialize a `U256` as a decimal string, the way the document stores amounts
mod u256_dec {
    use alloy_primitives::U256;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &U256, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(v)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<U256, D::Error> {
        let raw = String::deserialize(d)?;
        U256::from_str_radix(&raw, 10).map_err(serde::de::Error::custom)
    }
}

mod u256_dec_opt {
    use alloy_primitives::U256;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &Option<U256>, s: S) -> Result<S::Ok, S::Error> {
        match v {
            Some(v) => s.collect_str(v),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<U256>, D::Error> {
        let raw = Option::<String>::deserialize(d)?;
        raw.map(|r| U256::from_str_radix(&r, 10).map_err(serde::de::Error::custom))
            .transpose()
    }
}
