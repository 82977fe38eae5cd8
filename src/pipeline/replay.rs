//! Replay and lockout guard
//!
//! Not one object but a cache discipline the orchestrators apply: an atomic
//! dedup claim on the transaction's message fingerprint before any validation
//! runs, and a per-source cooldown after the fee transfer validates. Key
//! formats are part of the external contract and must not drift.
//!
//! The dedup key is written before validation completes and is never released
//! on failure: a rejected message stays blocked under its fingerprint. A
//! corrected resubmission carries new content or a new blockhash and therefore
//! a new fingerprint.

use sha2::{Digest, Sha256};
use solana_sdk::{hash::Hash, pubkey::Pubkey, transaction::Transaction};

use crate::cache::Cache;
use crate::pipeline::errors::PipelineError;

/// Dedup key over the transaction's signing payload:
/// `transaction/<base58(sha256(message_bytes))>`
pub fn transaction_key(transaction: &Transaction) -> String {
    let digest = Sha256::digest(transaction.message_data());
    format!("transaction/{}", bs58::encode(digest).into_string())
}

/// Cooldown key for the fee-transfer flow:
/// `transfer/lastSignature/<base58(source)>`
pub fn transfer_lockout_key(source: &Pubkey) -> String {
    format!("transfer/lastSignature/{}", source)
}

/// Cooldown key for the account-creation flow:
/// `createAccount/lastSignature/<base58(source)>`
pub fn create_account_lockout_key(source: &Pubkey) -> String {
    format!("createAccount/lastSignature/{}", source)
}

/// Duplicate-creation key for one associated account within one blockhash
/// window: `account/<blockhash>_<base58(ata)>`
pub fn account_key(blockhash: &Hash, associated_account: &Pubkey) -> String {
    format!("account/{}_{}", blockhash, associated_account)
}

/// Claim the transaction fingerprint, exactly once per process lifetime.
///
/// Runs before any other validation so that concurrent submissions of the
/// same message bytes cannot both reach signing. Atomic via
/// [`Cache::set_if_absent`].
pub async fn claim_transaction(
    cache: &dyn Cache,
    transaction: &Transaction,
) -> Result<(), PipelineError> {
    let key = transaction_key(transaction);
    if !cache.set_if_absent(&key, "1").await? {
        return Err(PipelineError::DuplicateTransaction);
    }
    Ok(())
}

/// Enforce the per-source cooldown window.
///
/// A prior timestamp within `window_ms` of `now_ms` rejects the request;
/// otherwise the key is overwritten with `now_ms`. The timestamp is a
/// parameter so tests control time. This is get-then-set: losing the race
/// between two concurrent requests admits at most one extra signature inside
/// the window, which the on-chain balance check already bounds.
pub async fn enforce_source_cooldown(
    cache: &dyn Cache,
    key: &str,
    now_ms: u64,
    window_ms: u64,
) -> Result<(), PipelineError> {
    if let Some(previous) = cache.get(key).await? {
        if let Ok(previous_ms) = previous.parse::<u64>() {
            if now_ms.saturating_sub(previous_ms) < window_ms {
                return Err(PipelineError::DuplicateTransfer);
            }
        }
    }
    cache.set(key, &now_ms.to_string()).await?;
    Ok(())
}

/// Current wall-clock time in milliseconds since the epoch.
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
