//! Ledger client capability
//!
//! The pipeline needs four things from the chain: token-account state,
//! account existence, dry-run simulation, and (for the API layer) broadcast.
//! [`LedgerClient`] is that seam; [`RpcLedgerClient`] is the production
//! implementation over the nonblocking RPC client.

use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{
    commitment_config::CommitmentConfig,
    program_pack::Pack,
    pubkey::Pubkey,
    signature::Signature,
    transaction::Transaction,
};
use thiserror::Error;

/// Infrastructure failure talking to the ledger
///
/// These are deliberately outside the pipeline's rejection taxonomy:
/// a flaky RPC node is not a bad transaction.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The requested account does not exist at the queried commitment
    #[error("account {0} not found")]
    AccountNotFound(Pubkey),

    /// The account exists but does not hold valid token-account data
    #[error("invalid token account data: {0}")]
    InvalidAccountData(String),

    /// Raw bytes failed to deserialize into a transaction
    #[error("transaction deserialization failed: {0}")]
    Deserialize(String),

    /// RPC transport or node error
    #[error("rpc error: {0}")]
    Rpc(String),
}

/// Snapshot of an SPL token account, as the pipeline consumes it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenAccountState {
    pub mint: Pubkey,
    pub owner: Pubkey,
    pub amount: u64,
    pub is_frozen: bool,
}

/// Result of a dry-run execution
#[derive(Debug, Clone, Default)]
pub struct SimulationOutcome {
    /// Execution error reported by the simulated run, if any
    pub error: Option<String>,
    /// Compute units the run consumed, when the node reports them
    pub units_consumed: Option<u64>,
}

/// Read/simulate/broadcast capability over the chain
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Current state of a token account; `AccountNotFound` if absent.
    async fn token_account(&self, address: &Pubkey) -> Result<TokenAccountState, LedgerError>;

    /// Whether any account exists at `address`.
    async fn account_exists(&self, address: &Pubkey) -> Result<bool, LedgerError>;

    /// Execute the transaction speculatively without committing.
    async fn simulate(&self, transaction: &Transaction) -> Result<SimulationOutcome, LedgerError>;

    /// Send raw signed bytes and wait for confirmation. The signing pipeline
    /// never calls this; it exists for the API layer that owns broadcasting.
    async fn broadcast(&self, raw: &[u8]) -> Result<Signature, LedgerError>;
}

/// Production ledger client over a single RPC endpoint
pub struct RpcLedgerClient {
    rpc: RpcClient,
    commitment: CommitmentConfig,
}

impl RpcLedgerClient {
    /// Connect at confirmed commitment, the pipeline's default.
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_commitment(url, CommitmentConfig::confirmed())
    }

    pub fn with_commitment(url: impl Into<String>, commitment: CommitmentConfig) -> Self {
        Self {
            rpc: RpcClient::new_with_commitment(url.into(), commitment),
            commitment,
        }
    }

    pub fn commitment(&self) -> CommitmentConfig {
        self.commitment
    }
}

#[async_trait]
impl LedgerClient for RpcLedgerClient {
    async fn token_account(&self, address: &Pubkey) -> Result<TokenAccountState, LedgerError> {
        let account = self
            .rpc
            .get_account_with_commitment(address, self.commitment)
            .await
            .map_err(|e| LedgerError::Rpc(e.to_string()))?
            .value
            .ok_or(LedgerError::AccountNotFound(*address))?;

        let token = spl_token::state::Account::unpack(&account.data)
            .map_err(|e| LedgerError::InvalidAccountData(e.to_string()))?;

        Ok(TokenAccountState {
            mint: token.mint,
            owner: token.owner,
            amount: token.amount,
            is_frozen: token.state == spl_token::state::AccountState::Frozen,
        })
    }

    async fn account_exists(&self, address: &Pubkey) -> Result<bool, LedgerError> {
        let response = self
            .rpc
            .get_account_with_commitment(address, self.commitment)
            .await
            .map_err(|e| LedgerError::Rpc(e.to_string()))?;
        Ok(response.value.is_some())
    }

    async fn simulate(&self, transaction: &Transaction) -> Result<SimulationOutcome, LedgerError> {
        let response = self
            .rpc
            .simulate_transaction(transaction)
            .await
            .map_err(|e| LedgerError::Rpc(e.to_string()))?;

        Ok(SimulationOutcome {
            error: response.value.err.map(|e| e.to_string()),
            units_consumed: response.value.units_consumed,
        })
    }

    async fn broadcast(&self, raw: &[u8]) -> Result<Signature, LedgerError> {
        let transaction: Transaction =
            bincode::deserialize(raw).map_err(|e| LedgerError::Deserialize(e.to_string()))?;
        self.rpc
            .send_and_confirm_transaction(&transaction)
            .await
            .map_err(|e| LedgerError::Rpc(e.to_string()))
    }
}
