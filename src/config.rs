//! Configuration for the co-signer service
//!
//! Loaded from a TOML file with environment overrides for deployment-specific
//! values. The token-fee allow-list is owned here: pubkeys arrive as base58
//! strings and are parsed once at load time into [`TokenFee`] entries the
//! pipeline reads but never mutates.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use solana_sdk::{commitment_config::CommitmentConfig, pubkey::Pubkey};
use std::str::FromStr;
use std::time::Duration;

/// Allow-list entry: the fee the service accepts in one asset
///
/// `fee` is the minimum transfer amount, in the mint's base units, that must
/// land in `account` for the service to co-sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenFee {
    /// Asset mint the fee is denominated in
    pub mint: Pubkey,
    /// Custody token account that must receive the fee
    pub account: Pubkey,
    /// Required fee amount in base units
    pub fee: u64,
    /// Decimal precision of the mint, asserted by checked transfers
    pub decimals: u8,
}

/// Main service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// RPC endpoint configuration
    pub rpc: RpcConfig,

    /// Custody key configuration
    pub custody: CustodyConfig,

    /// Signing limits and replay windows
    #[serde(default)]
    pub signing: SigningConfig,

    /// Accepted fee assets, in priority order
    pub fees: Vec<TokenFeeConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    /// RPC endpoint URL
    pub url: String,

    /// Commitment level for account reads and simulation
    #[serde(default = "default_commitment")]
    pub commitment: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustodyConfig {
    /// Path to the custody keypair file
    pub keypair_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SigningConfig {
    /// Maximum signature slots accepted in a submitted transaction
    #[serde(default = "default_max_signatures")]
    pub max_signatures: usize,

    /// Per-signature network fee ceiling, in lamports
    #[serde(default = "default_lamports_per_signature")]
    pub lamports_per_signature: u64,

    /// Cooldown window per fee-paying source account, in milliseconds
    #[serde(default = "default_same_source_timeout_ms")]
    pub same_source_timeout_ms: u64,
}

/// One allow-list entry as it appears on disk (base58 strings)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenFeeConfig {
    pub mint: String,
    pub account: String,
    pub fee: u64,
    pub decimals: u8,
}

// Default value functions
fn default_commitment() -> String {
    "confirmed".to_string()
}
fn default_max_signatures() -> usize {
    2
}
fn default_lamports_per_signature() -> u64 {
    5_000
}
fn default_same_source_timeout_ms() -> u64 {
    5_000
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            max_signatures: default_max_signatures(),
            lamports_per_signature: default_lamports_per_signature(),
            same_source_timeout_ms: default_same_source_timeout_ms(),
        }
    }
}

impl RpcConfig {
    /// Parse the configured commitment level.
    pub fn commitment_config(&self) -> Result<CommitmentConfig> {
        CommitmentConfig::from_str(&self.commitment)
            .map_err(|e| anyhow::anyhow!("invalid commitment level {:?}: {}", self.commitment, e))
    }
}

impl TokenFeeConfig {
    /// Parse the base58 fields into a pipeline-ready entry.
    pub fn resolve(&self) -> Result<TokenFee> {
        Ok(TokenFee {
            mint: Pubkey::from_str(&self.mint)
                .with_context(|| format!("invalid fee mint pubkey: {}", self.mint))?,
            account: Pubkey::from_str(&self.account)
                .with_context(|| format!("invalid fee account pubkey: {}", self.account))?,
            fee: self.fee,
            decimals: self.decimals,
        })
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path))?;
        Ok(config)
    }

    /// Load from file, then apply `FEEGATE_RPC_URL` / `FEEGATE_KEYPAIR_PATH`
    /// environment overrides if present.
    pub fn from_file_with_env(path: &str) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        if let Ok(url) = std::env::var("FEEGATE_RPC_URL") {
            config.rpc.url = url;
        }
        if let Ok(path) = std::env::var("FEEGATE_KEYPAIR_PATH") {
            config.custody.keypair_path = path;
        }
        Ok(config)
    }

    /// Resolve the allow-list into parsed [`TokenFee`] entries.
    pub fn token_fees(&self) -> Result<Vec<TokenFee>> {
        self.fees.iter().map(TokenFeeConfig::resolve).collect()
    }

    /// Cooldown window as a duration.
    pub fn same_source_timeout(&self) -> Duration {
        Duration::from_millis(self.signing.same_source_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [rpc]
        url = "http://localhost:8899"

        [custody]
        keypair_path = "/etc/feegate/custody.json"

        [[fees]]
        mint = "So11111111111111111111111111111111111111112"
        account = "SysvarC1ock11111111111111111111111111111111"
        fee = 100
        decimals = 9
    "#;

    #[test]
    fn test_parse_with_defaults() {
        let config: Config = toml::from_str(SAMPLE).unwrap();
        assert_eq!(config.rpc.commitment, "confirmed");
        assert_eq!(
            config.rpc.commitment_config().unwrap(),
            CommitmentConfig::confirmed()
        );
        assert_eq!(config.signing.max_signatures, 2);
        assert_eq!(config.signing.same_source_timeout_ms, 5_000);
        assert_eq!(config.same_source_timeout(), Duration::from_millis(5_000));

        let fees = config.token_fees().unwrap();
        assert_eq!(fees.len(), 1);
        assert_eq!(fees[0].fee, 100);
        assert_eq!(fees[0].decimals, 9);
    }

    #[test]
    fn test_invalid_pubkey_rejected() {
        let entry = TokenFeeConfig {
            mint: "not-a-pubkey".to_string(),
            account: "So11111111111111111111111111111111111111112".to_string(),
            fee: 1,
            decimals: 0,
        };
        assert!(entry.resolve().is_err());
    }
}
