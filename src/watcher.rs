//! Pool watcher: buy/sell alerts for large token transfers touching the
//! liquidity pool. Independent of the ticket path; duplicates here are
//! user-visible noise, so each transaction hash is marked seen and persisted
//! before its alert goes out.

use alloy_primitives::U256;
use tracing::{error, info};

use crate::engine::Engine;
use crate::error::DrawError;
use crate::rpc::{ChainRpc, TransferLog};
use crate::secret::SecretProvider;
use crate::state::{addr_key, fmt_tokens, now_ms, tx_key};
use crate::store::Store;

/// Blocks covered by each watch pass
const WATCH_WINDOW: u64 = 1_000;
/// Newest logs considered per pass
const WATCH_TAIL: usize = 400;
/// Seen-transaction cap; oldest entries are evicted past this
const SEEN_CAP: usize = 5_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TradeSide {
    Buy,
    Sell,
}

/// One alert-worthy pool trade
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolAlert {
    pub side: TradeSide,
    pub wallet: String,
    pub value: U256,
    pub tx: String,
}

impl PoolAlert {
    /// Human-readable alert line with an explorer link
    pub fn render(&self, explorer_tx: &str) -> String {
        let verb = match self.side {
            TradeSide::Buy => "BUY",
            TradeSide::Sell => "SELL",
        };
        format!(
            "{verb}: {} tokens by {} {}{}",
            fmt_tokens(self.value),
            short(&self.wallet),
            explorer_tx,
            self.tx
        )
    }
}

/// Where rendered alerts go
#[allow(async_fn_in_trait)]
pub trait AlertSink: Send + Sync {
    async fn send(&self, text: &str);
}

/// Sink that just logs; the default when no chat integration is wired up
pub struct LogAlertSink;

impl AlertSink for LogAlertSink {
    async fn send(&self, text: &str) {
        info!(alert = text, "pool alert");
    }
}

/// `0xaaaa…bbbb` shortening for chat messages
fn short(wallet: &str) -> String {
    if wallet.len() <= 10 {
        return wallet.to_string();
    }
    format!("{}…{}", &wallet[..6], &wallet[wallet.len() - 4..])
}

/// Trade direction relative to the pool. Transfers between the pool and
/// itself, or not touching it at all, are ignored.
fn classify(log: &TransferLog, pool: &alloy_primitives::Address) -> Option<(TradeSide, String)> {
    if log.from == *pool && log.to != *pool {
        return Some((TradeSide::Buy, addr_key(&log.to)));
    }
    if log.to == *pool && log.from != *pool {
        return Some((TradeSide::Sell, addr_key(&log.from)));
    }
    None
}

impl<R: ChainRpc, S: Store, P: SecretProvider> Engine<R, S, P> {
    /// One watch pass: fetch the recent window, alert on unseen trades at or
    /// above the configured minimum. No-op when no pool is configured.
    pub async fn scan_pool<A: AlertSink>(&self, sink: &A) {
        let Some(pool) = self.cfg.pool else {
            return;
        };
        if let Err(e) = self.watch_pass(pool, sink).await {
            error!(error = %e, "pool watch pass failed");
        }
    }

    async fn watch_pass<A: AlertSink>(
        &self,
        pool: alloy_primitives::Address,
        sink: &A,
    ) -> Result<(), DrawError> {
        let head = self.rpc.block_number().await?;
        let from = head.saturating_sub(WATCH_WINDOW);
        let logs = self
            .rpc
            .transfer_logs(self.cfg.token, None, from, head)
            .await?;

        let tail_start = logs.len().saturating_sub(WATCH_TAIL);
        let mut alerts = Vec::new();
        {
            let mut doc = self.doc.lock().await;
            for log in &logs[tail_start..] {
                if log.value < self.cfg.alert_min {
                    continue;
                }
                let Some((side, wallet)) = classify(log, &pool) else {
                    continue;
                };
                let tx = tx_key(&log.tx_hash);
                if doc.seen_tx.contains_key(&tx) {
                    continue;
                }
                doc.seen_tx.insert(tx.clone(), now_ms());
                alerts.push(PoolAlert {
                    side,
                    wallet,
                    value: log.value,
                    tx,
                });
            }
            trim_seen(&mut doc.seen_tx);
            if !alerts.is_empty() {
                // persist the seen set before sending so a crash mid-send
                // cannot replay alerts
                self.persist(&doc)?;
            }
        }

        for alert in alerts {
            sink.send(&alert.render(&self.cfg.explorer_tx)).await;
        }
        Ok(())
    }
}

fn trim_seen(seen: &mut std::collections::BTreeMap<String, u64>) {
    while seen.len() > SEEN_CAP {
        let oldest = seen
            .iter()
            .min_by_key(|(_, &ts)| ts)
            .map(|(tx, _)| tx.clone());
        match oldest {
            Some(tx) => {
                seen.remove(&tx);
            }
            None => break,
        }
    }
}
