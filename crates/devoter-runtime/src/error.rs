use devoter_escrow::EscrowError;
use devoter_ledger::LedgerError;
use devoter_types::Address;
use thiserror::Error;

/// Errors surfaced by the host.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RuntimeError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Escrow(#[from] EscrowError),

    #[error("Timestamp regression: {requested} is before current timestamp {current}")]
    TimestampRegression { requested: u64, current: u64 },

    #[error("Invalid sender: the zero address cannot submit calls")]
    ZeroSender,

    #[error("Unauthorized sender {0:x}: escrow holding account is moved only by the escrow")]
    ReservedSender(Address),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl RuntimeError {
    /// Stable short code for the failure, for callers that map errors to
    /// their own status values.
    pub fn code(&self) -> &'static str {
        match self {
            RuntimeError::Ledger(e) => match e {
                LedgerError::InvalidAmount(_) => "InvalidAmount",
                LedgerError::InsufficientBalance { .. } => "InsufficientBalance",
                LedgerError::InsufficientAllowance { .. } => "InsufficientAllowance",
                LedgerError::Overflow(_) => "Overflow",
                LedgerError::Unauthorized => "Unauthorized",
                LedgerError::InvalidRecipient(_) => "InvalidRecipient",
                LedgerError::InvalidQuery { .. } => "InvalidQuery",
                LedgerError::ClockRegression { .. } => "ClockRegression",
                LedgerError::InvariantViolation(_) => "InvariantViolation",
            },
            RuntimeError::Escrow(e) => match e {
                EscrowError::InvalidAmount => "InvalidAmount",
                EscrowError::AlreadyEscrowed => "AlreadyEscrowed",
                EscrowError::NoActiveEscrow => "NoActiveEscrow",
                EscrowError::LockNotExpired { .. } => "LockNotExpired",
                EscrowError::Unauthorized => "Unauthorized",
                EscrowError::InvalidRecipient(_) => "InvalidRecipient",
                EscrowError::Overflow(_) => "Overflow",
                EscrowError::Reentrancy(_) => "Reentrancy",
                EscrowError::InvalidParameter(_) => "InvalidParameter",
                EscrowError::InvariantViolation(_) => "InvariantViolation",
                EscrowError::Ledger(inner) => RuntimeError::Ledger(inner.clone()).code(),
            },
            RuntimeError::TimestampRegression { .. } => "ClockRegression",
            RuntimeError::ZeroSender => "InvalidRecipient",
            RuntimeError::ReservedSender(_) => "Unauthorized",
            RuntimeError::Config(_) => "InvalidConfig",
        }
    }
}
