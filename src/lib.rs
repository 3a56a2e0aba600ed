//! Ticket ledger and fair-draw engine for a community token raffle.
//!
//! Qualifying ERC-20 transfers into a collection wallet mint raffle tickets;
//! a cut of each is skimmed into a rolling jackpot pot. Rounds close with a
//! commit-reveal handshake anchored to a future block hash, so every draw is
//! verifiable from published values alone.

pub mod command;
pub mod config;
pub mod engine;
pub mod entropy;
pub mod error;
pub mod ledger;
pub mod rpc;
pub mod scanner;
pub mod scheduler;
pub mod secret;
pub mod state;
pub mod stats;
pub mod store;
pub mod watcher;

pub use command::{dispatch, Command};
pub use config::Config;
pub use engine::{CloseReport, Engine, JackpotStatus, PickReport, RaffleStatus};
pub use error::DrawError;
pub use ledger::TicketLedger;
pub use rpc::{ChainRpc, HttpRpc, RpcError, TransferLog};
pub use secret::{EnvSecret, SecretProvider};
pub use state::{Document, Round, RoundKind, WalletStats};
pub use store::{JsonFileStore, MemStore, Store, StoreError};
