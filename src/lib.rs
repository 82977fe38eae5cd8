//! feegate: fee-abstraction co-signer for Solana
//!
//! Accepts a transaction built by an untrusted party, verifies it pays a
//! configured SPL-token fee to a custody account and cannot drain the
//! custody signing key, then counter-signs it so the caller can broadcast.
//! The service sells its signature for a fee without ever holding user funds.
//!
//! The crate is the validation core only: HTTP handling, config loading at
//! process start, and broadcasting belong to the embedding API layer. It
//! talks to the outside world through two capability traits, [`LedgerClient`]
//! for chain state and [`Cache`] for replay coordination.

pub mod cache;
pub mod config;
pub mod ledger;
pub mod observability;
pub mod pipeline;
pub mod wallet;

#[cfg(test)]
pub(crate) mod test_utils;

pub use cache::{Cache, CacheError, MemoryCache};
pub use config::{Config, TokenFee};
pub use ledger::{LedgerClient, LedgerError, RpcLedgerClient, SimulationOutcome, TokenAccountState};
pub use observability::{init_tracing, RequestContext};
pub use pipeline::{
    create_account_with_token_fee, sign_with_token_fee, PipelineError, SignatureResponse,
};
pub use wallet::CustodyWallet;

// Re-export commonly used types
pub use solana_sdk::{pubkey::Pubkey, signature::Signature, transaction::Transaction};
