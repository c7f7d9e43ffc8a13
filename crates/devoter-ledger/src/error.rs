use devoter_types::U256;
use thiserror::Error;

/// Errors that can occur in ledger operations.
///
/// Every error aborts its operation before any state is written.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LedgerError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(&'static str),

    #[error("ERC20: transfer amount exceeds balance (have {have}, need {need})")]
    InsufficientBalance { have: U256, need: U256 },

    #[error("ERC20: insufficient allowance (have {have}, need {need})")]
    InsufficientAllowance { have: U256, need: U256 },

    #[error("Arithmetic overflow: {0}")]
    Overflow(&'static str),

    #[error("ERC20: caller is not authorized to mint")]
    Unauthorized,

    #[error("Invalid recipient: {0}")]
    InvalidRecipient(&'static str),

    #[error("Future lookup: block {requested} is not before current block {current}")]
    InvalidQuery { requested: u64, current: u64 },

    #[error("Clock regression: block {requested} is before current block {current}")]
    ClockRegression { requested: u64, current: u64 },

    #[error("Invariant violated: {0}")]
    InvariantViolation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LedgerError::InvalidQuery { requested: 7, current: 5 };
        assert!(err.to_string().contains("7"));
        assert!(err.to_string().contains("5"));
        assert_eq!(
            LedgerError::Unauthorized.to_string(),
            "ERC20: caller is not authorized to mint"
        );
    }
}
