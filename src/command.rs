//! Operator command surface: parseable command enum plus a dispatcher that
//! turns engine results into chat-friendly replies. Transport-agnostic; the
//! caller identity is whatever string the front end authenticates.

use crate::engine::{CloseReport, Engine, PickReport};
use crate::error::DrawError;
use crate::rpc::ChainRpc;
use crate::secret::SecretProvider;
use crate::state::{fmt_tokens, RoundKind};
use crate::stats::StatMetric;
use crate::store::Store;

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    OpenRaffle,
    CloseRaffle,
    PickRaffle,
    RaffleStatus,
    ExportLedger,
    OpenJackpot,
    CloseJackpot,
    PickJackpot,
    ResetJackpot,
    JackpotStatus,
    TopTickets,
    TopWins,
    TopXp,
    GrantXp { wallet: String, xp: u64 },
}

impl Command {
    /// Mutating commands require an operator; read-only ones do not
    pub fn requires_operator(&self) -> bool {
        !matches!(
            self,
            Command::RaffleStatus
                | Command::JackpotStatus
                | Command::TopTickets
                | Command::TopWins
                | Command::TopXp
        )
    }
}

const LEADERBOARD_SIZE: usize = 10;

/// Run one command on behalf of `caller` and render the outcome. Errors come
/// back as replies too; nothing here should take the front end down.
pub async fn dispatch<R: ChainRpc, S: Store, P: SecretProvider>(
    engine: &Engine<R, S, P>,
    caller: &str,
    cmd: Command,
) -> String {
    if cmd.requires_operator() && !engine.cfg.operators.iter().any(|op| op == caller) {
        return DrawError::Unauthorized.to_string();
    }

    let result = run(engine, cmd).await;
    result.unwrap_or_else(|e| e.to_string())
}

async fn run<R: ChainRpc, S: Store, P: SecretProvider>(
    engine: &Engine<R, S, P>,
    cmd: Command,
) -> Result<String, DrawError> {
    match cmd {
        Command::OpenRaffle => {
            let round = engine.open_raffle().await?;
            Ok(format!(
                "Raffle {} is open. {} tokens per ticket.",
                round.id,
                fmt_tokens(round.ticket_price.unwrap_or_default())
            ))
        }
        Command::CloseRaffle => Ok(render_close(engine.close_raffle().await?)),
        Command::PickRaffle => Ok(render_pick(engine.pick_raffle().await?)),
        Command::RaffleStatus => {
            let status = engine.raffle_status().await;
            Ok(match status.round {
                Some(r) if !r.closed => format!(
                    "Raffle {} is open with {} tickets sold. Jackpot pot: {} tokens.",
                    r.id,
                    status.total_tickets,
                    fmt_tokens(status.pot)
                ),
                Some(r) => format!(
                    "Raffle {} is closed, drawing at block {}. Winner: {}.",
                    r.id,
                    r.end_block,
                    r.winner.as_deref().unwrap_or("not drawn yet")
                ),
                None => "No raffle round exists yet.".to_string(),
            })
        }
        Command::ExportLedger => engine.export_ledger().await,
        Command::OpenJackpot => {
            let round = engine.open_jackpot().await?;
            Ok(format!("Jackpot round {} is open.", round.id))
        }
        Command::CloseJackpot => Ok(render_close(engine.close_jackpot().await?)),
        Command::PickJackpot => Ok(render_pick(engine.pick_jackpot().await?)),
        Command::ResetJackpot => {
            engine.reset_jackpot().await?;
            Ok("Jackpot pot reset to zero.".to_string())
        }
        Command::JackpotStatus => {
            let status = engine.jackpot_status().await;
            let pot = fmt_tokens(status.pot);
            Ok(match status.round {
                Some(r) if !r.closed => {
                    format!("Jackpot round {} is open. Pot: {pot} tokens.", r.id)
                }
                Some(r) => format!(
                    "Jackpot round {} closed, drawing at block {}. Pot: {pot} tokens. Winner: {}.",
                    r.id,
                    r.end_block,
                    r.winner.as_deref().unwrap_or("not drawn yet")
                ),
                None => format!("No jackpot round. Pot: {pot} tokens."),
            })
        }
        Command::TopTickets => Ok(render_board(
            "tickets",
            engine.leaderboard(StatMetric::Tickets, LEADERBOARD_SIZE).await,
            |s| s.tickets,
        )),
        Command::TopWins => Ok(render_board(
            "wins",
            engine.leaderboard(StatMetric::Wins, LEADERBOARD_SIZE).await,
            |s| s.wins,
        )),
        Command::TopXp => Ok(render_board(
            "xp",
            engine.leaderboard(StatMetric::Xp, LEADERBOARD_SIZE).await,
            |s| s.xp,
        )),
        Command::GrantXp { wallet, xp } => {
            let total = engine.grant_xp(&wallet, xp).await?;
            Ok(format!("Granted {xp} xp to {wallet} (now {total})."))
        }
    }
}

fn render_close(report: CloseReport) -> String {
    format!(
        "{} round {} closed at head {}. Drawing from block {}.\n\
         snapshot: {}\nsalt commit: {}",
        capitalized(report.kind),
        report.id,
        report.head,
        report.end_block,
        report.snapshot_hash,
        report.salt_commit
    )
}

fn render_pick(report: PickReport) -> String {
    let mut out = format!(
        "{} round {} winner: {} ({} entries).\n\
         block {} hash: {}\nsalt: {} (commit {})\nentropy: {}\nsnapshot: {}",
        capitalized(report.kind),
        report.id,
        report.winner,
        report.total_entries,
        report.end_block,
        report.block_hash,
        report.salt_reveal,
        report.salt_commit,
        report.entropy,
        report.snapshot_hash
    );
    if let Some(pot) = report.pot {
        out.push_str(&format!("\npot: {} tokens", fmt_tokens(pot)));
    }
    out
}

fn render_board(
    label: &str,
    rows: Vec<(String, crate::state::WalletStats)>,
    pick: impl Fn(&crate::state::WalletStats) -> u64,
) -> String {
    if rows.is_empty() {
        return format!("No {label} recorded yet.");
    }
    let mut out = format!("Top {label}:");
    for (rank, (wallet, stats)) in rows.iter().enumerate() {
        out.push_str(&format!("\n{}. {} ({})", rank + 1, wallet, pick(stats)));
    }
    out
}

fn capitalized(kind: RoundKind) -> &'static str {
    match kind {
        RoundKind::Raffle => "Raffle",
        RoundKind::Jackpot => "Jackpot",
    }
}
