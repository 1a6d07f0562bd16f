//! Merkledrop Settlement
//!
//! Claim verification and settlement state machine.
//!
//! The engine owns commitment state (root, escrow accounting, settled
//! totals) keyed by an explicit commitment identifier, and drives a
//! `HostLedger`, the trait standing in for the execution environment
//! that holds balances and claim receipts. Every ledger operation is a
//! single all-or-nothing unit: there are no suspension points, and a
//! claim that fails at any step leaves no partial state behind.

mod engine;
mod host;
mod persist;

pub use engine::{commitment_id, CommitmentId, CommitmentState, SettlementEngine};
pub use host::{HostLedger, InMemoryLedger, LedgerSnapshot};
pub use persist::{load_state, save_state};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettlementError {
    #[error("Commitment not initialized: {0}")]
    NotInitialized(String),

    #[error("Commitment already initialized: {0}")]
    AlreadyInitialized(String),

    #[error("Invalid proof")]
    InvalidProof,

    #[error("Already claimed")]
    AlreadyClaimed,

    #[error("Insufficient escrow: need {need}, have {have}")]
    InsufficientEscrow { need: u64, have: u64 },

    #[error("Insufficient funds: need {need}, have {have}")]
    InsufficientFunds { need: u64, have: u64 },

    #[error("Arithmetic overflow in settlement bookkeeping")]
    Overflow,

    #[error("State I/O error: {0}")]
    StateIo(#[from] std::io::Error),

    #[error("State format error: {0}")]
    StateFormat(String),
}

pub type Result<T> = std::result::Result<T, SettlementError>;
