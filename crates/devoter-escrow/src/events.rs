//! Escrow events.

use devoter_types::{Address, U256};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum EscrowEvent {
    /// `amount` is the principal left after the fee.
    TokensDeposited {
        account: Address,
        amount: U256,
        release_timestamp: u64,
    },
    TokensReleased {
        account: Address,
        amount: U256,
    },
    ReleaseTimestampUpdated {
        account: Address,
        previous: u64,
        release_timestamp: u64,
    },
    OwnershipTransferred {
        previous_owner: Address,
        new_owner: Address,
    },
}

impl EscrowEvent {
    pub fn name(&self) -> &'static str {
        match self {
            EscrowEvent::TokensDeposited { .. } => "TokensDeposited",
            EscrowEvent::TokensReleased { .. } => "TokensReleased",
            EscrowEvent::ReleaseTimestampUpdated { .. } => "ReleaseTimestampUpdated",
            EscrowEvent::OwnershipTransferred { .. } => "OwnershipTransferred",
        }
    }
}
