//! DEVoter Escrow - time-locked voter deposits.
//!
//! Each account may hold one active escrow. A deposit pays a percentage fee
//! to the fee wallet, parks the rest in the engine's holding account on the
//! ledger, and locks it for the voting period. Release returns the principal
//! once the lock has expired; the owner may move any account's release time.

pub mod engine;
pub mod error;
pub mod events;
pub mod guard;

pub use engine::{Escrow, EscrowEngine, EscrowParams};
pub use error::EscrowError;
pub use events::EscrowEvent;
pub use guard::ReentrancyGuard;

/// Fee percentages are expressed out of this denominator.
pub const FEE_DENOMINATOR: u64 = 100;
