//! Points Ledger
//!
//! Permissioned point-ledger engine for a community staff-points
//! program: atomic balance mutations with an immutable, per-user audit
//! history from which balances and statements can always be rebuilt.
//!
//! # Architecture
//!
//! - **Ledger Store**: RocksDB balance table, one record per identity
//! - **Ledger Engine**: atomic `modify` under a per-identity lock
//! - **History Index**: append-only, time-ordered mutation log
//! - **Statement**: deterministic text rendering of a history sequence
//!
//! # Invariants
//!
//! - Conservation: `after - before == ±amount` for every record
//! - Reconstruction: newest record's `after` equals the stored balance
//! - Append-only: history records never modified or deleted
//! - Per-identity serializability: mutations for one user linearize

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod audit;
pub mod config;
pub mod cooldown;
pub mod error;
pub mod ledger;
pub mod metrics;
pub mod statement;
pub mod storage;
pub mod types;

// Re-exports
pub use config::Config;
pub use error::{Error, Result};
pub use ledger::Ledger;
pub use storage::Storage;
pub use types::{
    ActionType, BalanceRecord, HistoryRecord, Mutation, MutationOutcome, Policy, UserId,
};
