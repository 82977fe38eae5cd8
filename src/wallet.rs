//! Custody keypair management
//!
//! The custody key is the asset this whole service protects. It is loaded
//! once, held behind an `Arc`, and only ever read during signing.

use anyhow::{Context, Result};
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signer},
};
use std::sync::Arc;

/// Holder of the service's custody signing key
pub struct CustodyWallet {
    keypair: Arc<Keypair>,
}

impl CustodyWallet {
    /// Load the custody keypair from a file.
    ///
    /// Accepts either raw 64-byte keypair files or the JSON byte-array
    /// format the Solana CLI writes.
    pub fn from_file(path: &str) -> Result<Self> {
        let keypair_bytes = std::fs::read(path)
            .with_context(|| format!("failed to read keypair file: {}", path))?;

        let keypair = if keypair_bytes.len() == 64 {
            if keypair_bytes.iter().all(|&b| b == 0) {
                anyhow::bail!("invalid keypair: all-zero key rejected");
            }
            Keypair::try_from(keypair_bytes.as_slice()).context("invalid keypair bytes")?
        } else {
            let json: Vec<u8> =
                serde_json::from_slice(&keypair_bytes).context("failed to parse keypair JSON")?;
            if json.len() != 64 {
                anyhow::bail!("invalid keypair length: expected 64 bytes, got {}", json.len());
            }
            if json.iter().all(|&b| b == 0) {
                anyhow::bail!("invalid keypair: all-zero key rejected");
            }
            Keypair::try_from(json.as_slice()).context("invalid keypair from JSON")?
        };

        Ok(Self {
            keypair: Arc::new(keypair),
        })
    }

    pub fn from_keypair(keypair: Keypair) -> Self {
        Self {
            keypair: Arc::new(keypair),
        }
    }

    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }

    pub fn keypair_arc(&self) -> Arc<Keypair> {
        Arc::clone(&self.keypair)
    }
}

impl Clone for CustodyWallet {
    fn clone(&self) -> Self {
        Self {
            keypair: Arc::clone(&self.keypair),
        }
    }
}
