//! DEVoter Types - value types shared by the ledger and the escrow.
//!
//! - Addresses (20-byte, Bech32m encoded)
//! - U256 (256-bit unsigned integer with checked arithmetic)

pub mod address;
pub mod u256;
pub mod error;

#[cfg(feature = "serde")]
mod serialization;

pub use address::Address;
pub use u256::U256;
pub use error::TypesError;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{Address, TypesError, U256};
}
