//! DEVoter Ledger - fungible token balances with delegated voting power.
//!
//! This crate provides:
//! - ERC20-style balances, allowances and issuer-only minting
//! - Single-hop delegation of voting power
//! - Per-account checkpoint history with point-in-time lookups
//! - An append-only event log for indexers

pub mod checkpoint;
pub mod error;
pub mod events;
pub mod token;

pub use checkpoint::{Checkpoint, CheckpointArena, SupplyHistory};
pub use error::LedgerError;
pub use events::LedgerEvent;
pub use token::{VotingLedger, DEFAULT_DECIMALS};

/// Largest total supply the ledger will mint up to: `2^208 - 1`.
pub fn max_supply() -> devoter_types::U256 {
    devoter_types::U256::low_mask(208)
}
