use alloy_primitives::U256;
use nanoid::nanoid;
use tokio::sync::Mutex;
use tracing::info;

use crate::config::Config;
use crate::entropy;
use crate::error::DrawError;
use crate::ledger::TicketLedger;
use crate::rpc::ChainRpc;
use crate::secret::SecretProvider;
use crate::state::{Document, Round, RoundKind};
use crate::stats::{top_n, StatMetric};
use crate::state::WalletStats;
use crate::store::Store;

/// Everything a close command publishes
#[derive(Clone, Debug)]
pub struct CloseReport {
    pub id: String,
    pub kind: RoundKind,
    /// Head observed at close time
    pub head: u64,
    pub end_block: u64,
    pub snapshot_hash: String,
    pub salt_commit: String,
}

/// Everything needed to independently verify a draw
#[derive(Clone, Debug)]
pub struct PickReport {
    pub id: String,
    pub kind: RoundKind,
    pub winner: String,
    pub total_entries: usize,
    pub end_block: u64,
    pub block_hash: String,
    pub salt_commit: String,
    pub salt_reveal: String,
    pub entropy: String,
    pub snapshot_hash: String,
    /// Pot at pick time, jackpot rounds only
    pub pot: Option<U256>,
}

#[derive(Clone, Debug)]
pub struct RaffleStatus {
    pub round: Option<Round>,
    pub total_tickets: u64,
    pub pot: U256,
}

#[derive(Clone, Debug)]
pub struct JackpotStatus {
    pub pot: U256,
    pub round: Option<Round>,
}

/// The round state machine plus the shared document it governs.
///
/// The document lives behind one async mutex; every command and every scan
/// pass completes its whole read-modify-persist sequence while holding it, so
/// the store only ever sees consistent documents.
pub struct Engine<R, S, P> {
    pub cfg: Config,
    pub(crate) rpc: R,
    pub(crate) store: S,
    pub(crate) secret: P,
    pub(crate) doc: Mutex<Document>,
}

fn round_ref(doc: &Document, kind: RoundKind) -> Option<&Round> {
    match kind {
        RoundKind::Raffle => doc.raffle.as_ref(),
        RoundKind::Jackpot => doc.jackpot.current.as_ref(),
    }
}

fn round_mut(doc: &mut Document, kind: RoundKind) -> Option<&mut Round> {
    match kind {
        RoundKind::Raffle => doc.raffle.as_mut(),
        RoundKind::Jackpot => doc.jackpot.current.as_mut(),
    }
}

/// Entrant list for the draw: ticket-weighted for raffles, one entry per
/// wallet for jackpots. Reads the round's own (frozen) ledger.
fn draw_entries(doc: &Document, round: &Round) -> Vec<String> {
    let Some(ledger) = doc.tickets.get(&round.id) else {
        return Vec::new();
    };
    match round.kind {
        RoundKind::Raffle => ledger.entries().into_iter().map(str::to_string).collect(),
        RoundKind::Jackpot => ledger.wallets().into_iter().map(str::to_string).collect(),
    }
}

impl<R: ChainRpc, S: Store, P: SecretProvider> Engine<R, S, P> {
    pub fn new(cfg: Config, rpc: R, store: S, secret: P) -> Result<Self, DrawError> {
        let doc = store.load()?;
        Ok(Engine {
            cfg,
            rpc,
            store,
            secret,
            doc: Mutex::new(doc),
        })
    }

    pub(crate) fn persist(&self, doc: &Document) -> Result<(), DrawError> {
        self.store.save(doc)?;
        Ok(())
    }

    fn require_secret(&self) -> Result<&str, DrawError> {
        self.secret.reveal().ok_or(DrawError::SecretMissing)
    }

    /// Open a new raffle round with a fresh ledger
    pub async fn open_raffle(&self) -> Result<Round, DrawError> {
        let mut doc = self.doc.lock().await;
        if let Some(current) = &doc.raffle {
            if !current.closed {
                return Err(DrawError::RoundAlreadyOpen(RoundKind::Raffle));
            }
        }

        let round = Round::new(nanoid!(8), RoundKind::Raffle, Some(self.cfg.ticket_price));
        doc.tickets.insert(round.id.clone(), TicketLedger::default());
        doc.raffle = Some(round.clone());
        self.persist(&doc)?;

        info!(id = %round.id, "raffle round opened");
        Ok(round)
    }

    /// Open a new jackpot round; the pot keeps accruing independently
    pub async fn open_jackpot(&self) -> Result<Round, DrawError> {
        self.require_secret()?;
        let mut doc = self.doc.lock().await;
        if let Some(current) = &doc.jackpot.current {
            if !current.closed {
                return Err(DrawError::RoundAlreadyOpen(RoundKind::Jackpot));
            }
        }

        let round = Round::new(format!("JP-{}", nanoid!(6)), RoundKind::Jackpot, None);
        doc.jackpot.current = Some(round.clone());
        self.persist(&doc)?;

        info!(id = %round.id, "jackpot round opened");
        Ok(round)
    }

    /// Freeze the raffle ledger, commit to the secret, and fix the entropy
    /// block `entropy_offset` blocks past the current head
    pub async fn close_raffle(&self) -> Result<CloseReport, DrawError> {
        let secret = self.require_secret()?;
        let head = self.rpc.block_number().await?;

        let mut doc = self.doc.lock().await;
        let round = doc
            .raffle
            .as_ref()
            .ok_or(DrawError::NoActiveRound(RoundKind::Raffle))?;
        if round.closed {
            return Err(DrawError::RoundAlreadyClosed {
                id: round.id.clone(),
                end_block: round.end_block,
            });
        }

        let snapshot_hash = doc
            .tickets
            .get(&round.id)
            .map(|l| l.snapshot_hash())
            .unwrap_or_else(|| TicketLedger::default().snapshot_hash());

        let report = seal(
            doc.raffle.as_mut().ok_or(DrawError::NoActiveRound(RoundKind::Raffle))?,
            head,
            self.cfg.entropy_offset,
            snapshot_hash,
            entropy::salt_commit(secret),
        );
        self.persist(&doc)?;

        info!(id = %report.id, end_block = report.end_block, "raffle round closed");
        Ok(report)
    }

    /// Close the jackpot round. Entrants are the wallets holding tickets in
    /// the current raffle; their ledger is copied under the jackpot round id
    /// at this instant, so later raffle activity cannot change the draw.
    pub async fn close_jackpot(&self) -> Result<CloseReport, DrawError> {
        let secret = self.require_secret()?;
        let head = self.rpc.block_number().await?;

        let mut doc = self.doc.lock().await;
        let round = doc
            .jackpot
            .current
            .as_ref()
            .ok_or(DrawError::NoActiveRound(RoundKind::Jackpot))?;
        if round.closed {
            return Err(DrawError::RoundAlreadyClosed {
                id: round.id.clone(),
                end_block: round.end_block,
            });
        }
        if doc.jackpot.pot < self.cfg.jackpot_min_pot {
            return Err(DrawError::PotBelowMinimum {
                pot: doc.jackpot.pot,
                min: self.cfg.jackpot_min_pot,
            });
        }

        let frozen = doc
            .raffle
            .as_ref()
            .and_then(|r| doc.tickets.get(&r.id))
            .cloned()
            .unwrap_or_default();
        if frozen.is_empty() {
            return Err(DrawError::NoEntries);
        }
        let snapshot_hash = frozen.entrants_hash();
        let id = round.id.clone();
        doc.tickets.insert(id, frozen);

        let report = seal(
            doc.jackpot
                .current
                .as_mut()
                .ok_or(DrawError::NoActiveRound(RoundKind::Jackpot))?,
            head,
            self.cfg.entropy_offset,
            snapshot_hash,
            entropy::salt_commit(secret),
        );
        self.persist(&doc)?;

        info!(id = %report.id, end_block = report.end_block, "jackpot round closed");
        Ok(report)
    }

    pub async fn pick_raffle(&self) -> Result<PickReport, DrawError> {
        self.pick(RoundKind::Raffle).await
    }

    pub async fn pick_jackpot(&self) -> Result<PickReport, DrawError> {
        self.pick(RoundKind::Jackpot).await
    }

    /// Reveal the secret and derive the winner from the end-block hash
    async fn pick(&self, kind: RoundKind) -> Result<PickReport, DrawError> {
        let secret = self.require_secret()?;

        let (id, end_block, snapshot_hash, salt_commit) = {
            let doc = self.doc.lock().await;
            let round = round_ref(&doc, kind).ok_or(DrawError::NoActiveRound(kind))?;
            if !round.closed {
                return Err(DrawError::RoundNotClosed(round.id.clone()));
            }
            if round.picked() {
                return Err(DrawError::AlreadyPicked(round.id.clone()));
            }
            let snapshot = round
                .snapshot_hash
                .clone()
                .ok_or_else(|| DrawError::CorruptRound(round.id.clone()))?;
            let commit = round
                .salt_commit
                .clone()
                .ok_or_else(|| DrawError::CorruptRound(round.id.clone()))?;
            (round.id.clone(), round.end_block, snapshot, commit)
        };

        let head = self.rpc.block_number().await?;
        if head < end_block {
            return Err(DrawError::WaitForBlock { end_block, head });
        }
        let block_hash = self
            .rpc
            .get_block(end_block)
            .await?
            .and_then(|b| b.hash)
            .ok_or(DrawError::BlockNotReady(end_block))?;

        if !entropy::commit_matches(secret, &salt_commit) {
            return Err(DrawError::SaltCommitMismatch);
        }
        let entropy_hex = entropy::derive_entropy(&block_hash, secret, &snapshot_hash)?;

        let mut doc = self.doc.lock().await;
        let entries = {
            let round = round_ref(&doc, kind).ok_or(DrawError::NoActiveRound(kind))?;
            if round.id != id || round.picked() {
                return Err(DrawError::AlreadyPicked(id));
            }
            draw_entries(&doc, round)
        };
        if entries.is_empty() {
            return Err(DrawError::NoEntries);
        }

        let index = entropy::winner_index(&entropy_hex, entries.len())?;
        let winner = entries[index].clone();
        doc.wallet_stats_mut(&winner).wins += 1;
        let pot = (kind == RoundKind::Jackpot).then_some(doc.jackpot.pot);

        let round = round_mut(&mut doc, kind).ok_or(DrawError::NoActiveRound(kind))?;
        round.salt_reveal = Some(secret.to_string());
        round.entropy = Some(entropy_hex.clone());
        round.winner = Some(winner.clone());
        self.persist(&doc)?;

        info!(kind = %kind, id = %id, %winner, index, "winner drawn");
        Ok(PickReport {
            id,
            kind,
            winner,
            total_entries: entries.len(),
            end_block,
            block_hash: block_hash.to_string(),
            salt_commit,
            salt_reveal: secret.to_string(),
            entropy: entropy_hex,
            snapshot_hash,
            pot,
        })
    }

    /// Zero the pot and detach the round, after an out-of-band payout
    pub async fn reset_jackpot(&self) -> Result<(), DrawError> {
        let mut doc = self.doc.lock().await;
        if let Some(current) = &doc.jackpot.current {
            if !current.picked() {
                return Err(DrawError::RoundNotPicked(current.id.clone()));
            }
        }
        doc.jackpot.pot = U256::ZERO;
        doc.jackpot.current = None;
        self.persist(&doc)?;

        info!("jackpot pot reset");
        Ok(())
    }

    pub async fn raffle_status(&self) -> RaffleStatus {
        let doc = self.doc.lock().await;
        let total_tickets = doc
            .raffle
            .as_ref()
            .and_then(|r| doc.tickets.get(&r.id))
            .map(|l| l.total())
            .unwrap_or(0);
        RaffleStatus {
            round: doc.raffle.clone(),
            total_tickets,
            pot: doc.jackpot.pot,
        }
    }

    pub async fn jackpot_status(&self) -> JackpotStatus {
        let doc = self.doc.lock().await;
        JackpotStatus {
            pot: doc.jackpot.pot,
            round: doc.jackpot.current.clone(),
        }
    }

    /// Canonical `wallet,tickets` rows for the active raffle round
    pub async fn export_ledger(&self) -> Result<String, DrawError> {
        let doc = self.doc.lock().await;
        let round = doc
            .raffle
            .as_ref()
            .ok_or(DrawError::NoActiveRound(RoundKind::Raffle))?;
        Ok(doc
            .tickets
            .get(&round.id)
            .map(|l| l.to_csv())
            .unwrap_or_else(|| TicketLedger::default().to_csv()))
    }

    /// Experience grant from the quest-approval path; returns the new total
    pub async fn grant_xp(&self, wallet: &str, xp: u64) -> Result<u64, DrawError> {
        let wallet = wallet.to_ascii_lowercase();
        let mut doc = self.doc.lock().await;
        let stats = doc.wallet_stats_mut(&wallet);
        stats.xp += xp;
        let total = stats.xp;
        self.persist(&doc)?;
        Ok(total)
    }

    pub async fn leaderboard(&self, metric: StatMetric, n: usize) -> Vec<(String, WalletStats)> {
        let doc = self.doc.lock().await;
        top_n(&doc.stats, metric, n)
    }
}

fn seal(
    round: &mut Round,
    head: u64,
    offset: u64,
    snapshot_hash: String,
    salt_commit: String,
) -> CloseReport {
    round.closed = true;
    round.end_block = head + offset;
    round.snapshot_hash = Some(snapshot_hash.clone());
    round.salt_commit = Some(salt_commit.clone());
    round.salt_reveal = None;
    round.entropy = None;
    round.winner = None;
    CloseReport {
        id: round.id.clone(),
        kind: round.kind,
        head,
        end_block: round.end_block,
        snapshot_hash,
        salt_commit,
    }
}
