//! Ledger events, in the shape external indexers expect.

use devoter_types::{Address, U256};
use serde::{Deserialize, Serialize};

/// An event appended to the ledger log by a committed operation.
///
/// `Address::ZERO` stands for "no account": the `from` of a mint, the `to` of
/// a burn, and an unset delegate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum LedgerEvent {
    Transfer {
        from: Address,
        to: Address,
        value: U256,
    },
    Approval {
        owner: Address,
        spender: Address,
        value: U256,
    },
    DelegateChanged {
        delegator: Address,
        from_delegate: Address,
        to_delegate: Address,
    },
    DelegateVotesChanged {
        delegate: Address,
        previous_votes: U256,
        new_votes: U256,
    },
}

impl LedgerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            LedgerEvent::Transfer { .. } => "Transfer",
            LedgerEvent::Approval { .. } => "Approval",
            LedgerEvent::DelegateChanged { .. } => "DelegateChanged",
            LedgerEvent::DelegateVotesChanged { .. } => "DelegateVotesChanged",
        }
    }
}
