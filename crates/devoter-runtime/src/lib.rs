//! DEVoter Runtime - hosts a ledger and an escrow engine.
//!
//! The host owns both components, keeps the block clock, and applies
//! transactions one at a time in submission order.

pub mod config;
pub mod error;
pub mod host;
pub mod telemetry;

pub use config::{EscrowConfig, HostConfig, LoggingConfig, TokenConfig};
pub use error::RuntimeError;
pub use host::{BlockEnv, Call, Host, Receipt, Transaction};
pub use telemetry::{init_from_config, init_telemetry};
