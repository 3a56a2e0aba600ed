//! Incremental ticket scanner.
//!
//! Each pass walks the token's Transfer logs from the persisted cursor to the
//! chain head in fixed-size chunks, credits tickets for qualifying transfers
//! into the collection wallet, skims the jackpot cut, and advances the cursor.
//! The cursor and the ledger mutations of a chunk are saved in one write, so
//! a crash re-scans at most the current chunk. Re-delivered logs can credit
//! twice, and a chunk whose fetch keeps failing is skipped outright; the
//! counts are best-effort, never stalled.

use alloy_primitives::U256;
use tracing::{debug, error, info, warn};

use crate::engine::Engine;
use crate::error::DrawError;
use crate::rpc::{ChainRpc, TransferLog};
use crate::secret::SecretProvider;
use crate::state::addr_key;
use crate::store::Store;

impl<R: ChainRpc, S: Store, P: SecretProvider> Engine<R, S, P> {
    /// One full scan pass. Errors are logged, never propagated; the next
    /// scheduled pass picks up from the persisted cursor.
    pub async fn scan_tickets(&self) {
        if let Err(e) = self.scan_pass().await {
            error!(error = %e, "ticket scan pass failed");
        }
    }

    async fn scan_pass(&self) -> Result<(), DrawError> {
        let head = self.rpc.block_number().await?;

        let mut cursor = {
            let doc = self.doc.lock().await;
            doc.cursor
        };
        if cursor == 0 {
            cursor = head.saturating_sub(self.cfg.first_window);
            info!(from = cursor + 1, head, "no cursor yet, starting scan window");
        }
        if cursor >= head {
            return Ok(());
        }

        while cursor < head {
            let end = (cursor + self.cfg.chunk_size).min(head);
            let logs = self.fetch_chunk(cursor + 1, end).await;
            self.apply_chunk(&logs, head, end).await?;
            cursor = end;
        }
        Ok(())
    }

    /// Fetch one chunk of Transfer logs with bounded linear-backoff retries.
    /// A chunk that keeps failing is given up on and the scan moves past it:
    /// its transfers are lost to the ledger, but one bad range can never
    /// stall ticket scanning for good.
    async fn fetch_chunk(&self, from: u64, to: u64) -> Vec<TransferLog> {
        let mut attempt = 0u32;
        loop {
            match self
                .rpc
                .transfer_logs(self.cfg.token, Some(self.cfg.collection), from, to)
                .await
            {
                Ok(logs) => {
                    debug!(from, to, count = logs.len(), "chunk fetched");
                    return logs;
                }
                Err(e) if e.is_retriable() && attempt < self.cfg.retries => {
                    attempt += 1;
                    warn!(from, to, attempt, error = %e, "chunk fetch failed, retrying");
                    tokio::time::sleep(self.cfg.backoff * attempt).await;
                }
                Err(e) => {
                    error!(from, to, error = %e, "giving up on chunk, its transfers are lost");
                    return Vec::new();
                }
            }
        }
    }

    /// Credit one chunk's logs and persist it together with the new cursor.
    /// The cursor never moves past `head - confirmations`, so blocks whose
    /// events were too fresh to count are re-fetched next pass.
    async fn apply_chunk(
        &self,
        logs: &[TransferLog],
        head: u64,
        chunk_end: u64,
    ) -> Result<(), DrawError> {
        let confirmed = head.saturating_sub(self.cfg.confirmations);
        let mut doc = self.doc.lock().await;

        let open_round = doc
            .raffle
            .as_ref()
            .filter(|r| !r.closed)
            .map(|r| (r.id.clone(), r.ticket_price.unwrap_or(self.cfg.ticket_price)));

        for log in logs {
            if log.block_number > confirmed {
                continue;
            }
            let Some((round_id, price)) = &open_round else {
                continue;
            };
            let tickets = match u64::try_from(log.value / *price) {
                Ok(t) => t,
                Err(_) => {
                    warn!(tx = %log.tx_hash, "ticket count does not fit in u64, transfer ignored");
                    continue;
                }
            };
            if tickets == 0 {
                debug!(tx = %log.tx_hash, "transfer below ticket price, ignored");
                continue;
            }

            let wallet = addr_key(&log.from);
            doc.ledger_mut(round_id).credit(&wallet, tickets);
            doc.wallet_stats_mut(&wallet).tickets += tickets;

            let skim = log.value * U256::from(self.cfg.jackpot_percent) / U256::from(100u64);
            doc.jackpot.pot += skim;

            info!(
                %wallet,
                tickets,
                round = %round_id,
                block = log.block_number,
                "tickets credited"
            );
        }

        doc.cursor = chunk_end.min(confirmed).max(doc.cursor);
        self.persist(&doc)?;
        Ok(())
    }
}
