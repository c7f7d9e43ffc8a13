//! Reentrancy protection for escrow entry points.
//!
//! `deposit` and `release` hold the guard while they move ledger balances.
//! A second entry before the first one exits is rejected.

use crate::error::EscrowError;
use devoter_types::Address;

/// The call currently holding the guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuardFrame {
    /// Entry point name
    pub operation: &'static str,
    /// Account that made the call
    pub caller: Address,
}

/// Non-reentrant lock around escrow entry points.
#[derive(Debug, Clone, Default)]
pub struct ReentrancyGuard {
    active: Option<GuardFrame>,
}

impl ReentrancyGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the guard for `operation`.
    ///
    /// # Errors
    /// Returns `Reentrancy` if the guard is already held.
    pub fn enter(&mut self, operation: &'static str, caller: Address) -> Result<(), EscrowError> {
        if let Some(frame) = self.active {
            return Err(EscrowError::Reentrancy(frame.operation));
        }
        self.active = Some(GuardFrame { operation, caller });
        Ok(())
    }

    /// Release the guard, returning the frame that held it.
    pub fn exit(&mut self) -> Option<GuardFrame> {
        self.active.take()
    }

    pub fn is_entered(&self) -> bool {
        self.active.is_some()
    }

    pub fn current(&self) -> Option<&GuardFrame> {
        self.active.as_ref()
    }
}
