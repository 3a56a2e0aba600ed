use alloy_primitives::U256;
use thiserror::Error;

use crate::rpc::RpcError;
use crate::state::RoundKind;
use crate::store::StoreError;

/// Errors that may be returned by the draw engine
#[derive(Error, Debug)]
pub enum DrawError {
    /// No round of the requested kind exists
    #[error("no active {0} round")]
    NoActiveRound(RoundKind),

    /// A round of the requested kind is already open
    #[error("a {0} round is already open; close or pick it first")]
    RoundAlreadyOpen(RoundKind),

    /// Round is already closed
    #[error("round {id} is already closed at block {end_block}")]
    RoundAlreadyClosed { id: String, end_block: u64 },

    /// Round must be closed before it can be picked
    #[error("round {0} is not closed yet; close it first")]
    RoundNotClosed(String),

    /// Jackpot round must be picked before the pot can be reset
    #[error("jackpot round {0} has not been picked yet")]
    RoundNotPicked(String),

    /// Winner is set exactly once per round
    #[error("round {0} already has a winner")]
    AlreadyPicked(String),

    /// A closed round lost its snapshot or commit fields in the store
    #[error("round {0} is missing its commit data")]
    CorruptRound(String),

    /// No draw secret is configured
    #[error("no draw secret configured; set one and restart")]
    SecretMissing,

    /// The configured secret no longer matches the committed salt
    #[error("draw secret does not match the committed salt; do not rotate it mid-round")]
    SaltCommitMismatch,

    /// The entropy block has not been mined yet
    #[error("wait for block {end_block} (head is {head})")]
    WaitForBlock { end_block: u64, head: u64 },

    /// The entropy block exists but its hash is not yet available
    #[error("block {0} has no hash yet; retry shortly")]
    BlockNotReady(u64),

    /// The frozen ledger has no entries to draw from
    #[error("round has no entries")]
    NoEntries,

    /// The jackpot pot has not reached the configured minimum
    #[error("pot {pot} is below the minimum of {min} base units")]
    PotBelowMinimum { pot: U256, min: U256 },

    /// Caller is not in the operator list
    #[error("caller is not an operator")]
    Unauthorized,

    /// A digest stored with the round is not valid hex
    #[error("corrupt digest in stored round: {0}")]
    BadDigest(#[from] hex::FromHexError),

    #[error("rpc: {0}")]
    Rpc(#[from] RpcError),

    #[error("store: {0}")]
    Store(#[from] StoreError),

    #[error("config: {0}")]
    Config(String),
}
