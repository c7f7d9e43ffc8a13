use devoter_ledger::LedgerError;
use thiserror::Error;

/// Errors that can occur in escrow operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EscrowError {
    #[error("Deposit amount must be greater than 0")]
    InvalidAmount,

    #[error("User already has an active escrow")]
    AlreadyEscrowed,

    #[error("No active escrow")]
    NoActiveEscrow,

    #[error("Voting period is not over yet (now {now}, release at {release_timestamp})")]
    LockNotExpired { now: u64, release_timestamp: u64 },

    #[error("Ownable: caller is not the owner")]
    Unauthorized,

    #[error("Invalid recipient: {0}")]
    InvalidRecipient(&'static str),

    #[error("Arithmetic overflow: {0}")]
    Overflow(&'static str),

    #[error("ReentrancyGuard: reentrant call during {0}")]
    Reentrancy(&'static str),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}
