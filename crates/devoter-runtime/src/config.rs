//! Host configuration.
//!
//! Loaded from TOML. Amounts are decimal or 0x-hex strings, addresses are
//! 0x-hex or `dev1...` Bech32m strings.

use anyhow::Context;
use devoter_escrow::EscrowParams;
use devoter_types::{Address, U256};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 10^18, one whole token
const ONE_TOKEN: u128 = 1_000_000_000_000_000_000;

/// Host configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostConfig {
    pub token: TokenConfig,
    pub escrow: EscrowConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            token: TokenConfig::default(),
            escrow: EscrowConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl HostConfig {
    /// Load configuration from file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
        let config: HostConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file '{}'", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file.
    pub fn to_file(&self, path: &Path) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file '{}'", path.display()))?;
        Ok(())
    }

    /// Validate configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.token.issuer.is_zero() {
            anyhow::bail!("token issuer cannot be the zero address");
        }
        if !self.token.initial_supply.is_zero() && self.token.initial_holder.is_zero() {
            anyhow::bail!("initial supply needs a non-zero initial holder");
        }
        if self.escrow.fee_percentage > 100 {
            anyhow::bail!("fee percentage must be within 0..=100, got {}", self.escrow.fee_percentage);
        }
        if self.escrow.voting_period == 0 {
            anyhow::bail!("voting period must be greater than 0");
        }
        if self.escrow.holder.is_zero() || self.escrow.fee_wallet.is_zero() || self.escrow.owner.is_zero() {
            anyhow::bail!("escrow holder, fee wallet and owner must be non-zero");
        }
        if self.escrow.holder == self.escrow.fee_wallet {
            anyhow::bail!("escrow holder and fee wallet must differ");
        }
        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            anyhow::bail!("log format must be 'pretty' or 'json', got '{}'", self.logging.format);
        }
        Ok(())
    }
}

/// Voting token configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenConfig {
    pub name: String,
    pub symbol: String,
    /// Identity allowed to mint
    pub issuer: Address,
    /// Receives `initial_supply` at block 0
    pub initial_holder: Address,
    pub initial_supply: U256,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            name: "Mock DEV Token".to_string(),
            symbol: "mDEV".to_string(),
            issuer: default_owner(),
            initial_holder: default_owner(),
            initial_supply: U256::from(1_000_000 * ONE_TOKEN),
        }
    }
}

/// Escrow configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscrowConfig {
    /// Ledger account that holds escrowed principal
    pub holder: Address,
    pub owner: Address,
    pub fee_wallet: Address,
    pub fee_percentage: u8,
    /// Seconds
    pub voting_period: u64,
}

impl Default for EscrowConfig {
    fn default() -> Self {
        Self {
            holder: Address::from_bytes([0xee; 20]),
            owner: default_owner(),
            fee_wallet: Address::from_bytes([0xfe; 20]),
            fee_percentage: 10,
            voting_period: 30 * 24 * 60 * 60, // 30 days
        }
    }
}

impl EscrowConfig {
    pub fn params(&self) -> EscrowParams {
        EscrowParams {
            holder: self.holder,
            owner: self.owner,
            fee_wallet: self.fee_wallet,
            fee_percentage: self.fee_percentage,
            voting_period: self.voting_period,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// EnvFilter directive, e.g. "info" or "devoter_escrow=debug"
    pub level: String,
    /// json|pretty
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

fn default_owner() -> Address {
    let mut bytes = [0u8; 20];
    bytes[19] = 1;
    Address::from_bytes(bytes)
}
