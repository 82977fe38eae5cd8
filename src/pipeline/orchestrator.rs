//! Signing orchestrators
//!
//! The two entry points of the service. Both are pure sequencing over the
//! pipeline stages; the first failing stage aborts the request with that
//! stage's error and no compensating rollback of cache keys already written.
//! Neither broadcasts: handing back the custody signature is where this
//! core's responsibility ends.

use serde::Serialize;
use solana_sdk::{
    signature::{Keypair, Signer},
    transaction::Transaction,
};
use std::time::Duration;

use crate::cache::Cache;
use crate::config::TokenFee;
use crate::ledger::LedgerClient;
use crate::observability::RequestContext;
use crate::pipeline::{account_init, drain, envelope, replay, simulate, transfer, PipelineError};

/// Default per-source cooldown window.
pub const DEFAULT_SAME_SOURCE_TIMEOUT: Duration = Duration::from_millis(5_000);

/// Successful pipeline result, as the API layer serializes it
#[derive(Debug, Clone, Serialize)]
pub struct SignatureResponse {
    /// Base-58 custody signature over the submitted transaction
    pub signature: String,
}

/// Validate a fee-paying transaction and counter-sign it.
///
/// Stage order: dedup, envelope, custody-key exposure scan, fee transfer,
/// per-source cooldown, simulation.
#[allow(clippy::too_many_arguments)]
pub async fn sign_with_token_fee(
    ledger: &dyn LedgerClient,
    transaction: Transaction,
    custody: &Keypair,
    max_signatures: usize,
    lamports_per_signature: u64,
    allowed_tokens: &[TokenFee],
    cache: &dyn Cache,
    same_source_timeout: Option<Duration>,
) -> Result<SignatureResponse, PipelineError> {
    let ctx = RequestContext::new("signWithTokenFee");
    let result = run_sign_with_token_fee(
        &ctx,
        ledger,
        transaction,
        custody,
        max_signatures,
        lamports_per_signature,
        allowed_tokens,
        cache,
        same_source_timeout.unwrap_or(DEFAULT_SAME_SOURCE_TIMEOUT),
    )
    .await;
    if let Err(error) = &result {
        ctx.rejected(error);
    }
    result
}

#[allow(clippy::too_many_arguments)]
async fn run_sign_with_token_fee(
    ctx: &RequestContext,
    ledger: &dyn LedgerClient,
    mut transaction: Transaction,
    custody: &Keypair,
    max_signatures: usize,
    lamports_per_signature: u64,
    allowed_tokens: &[TokenFee],
    cache: &dyn Cache,
    same_source_timeout: Duration,
) -> Result<SignatureResponse, PipelineError> {
    replay::claim_transaction(cache, &transaction).await?;
    ctx.stage("dedup");

    let signed =
        envelope::validate_and_sign(&mut transaction, custody, max_signatures, lamports_per_signature)?;
    ctx.stage("envelope");

    drain::validate_no_key_exposure(&transaction, &custody.pubkey())?;
    ctx.stage("drain");

    let transfer = transfer::validate_transfer(ledger, &transaction, allowed_tokens).await?;
    ctx.stage("transfer");

    replay::enforce_source_cooldown(
        cache,
        &replay::transfer_lockout_key(&transfer.source().pubkey),
        replay::now_ms(),
        same_source_timeout.as_millis() as u64,
    )
    .await?;
    ctx.stage("lockout");

    let outcome = simulate::simulate_raw(ledger, &signed.raw).await?;
    ctx.stage("simulation");

    let signature = signed.signature.to_string();
    ctx.signed(&signature, outcome.units_consumed);
    Ok(SignatureResponse { signature })
}

/// Validate a fee-paying account-creation transaction and counter-sign it.
///
/// Same shape as [`sign_with_token_fee`], with the account-initialization
/// validator in place of the exposure scan and the `createAccount` cooldown
/// key family.
#[allow(clippy::too_many_arguments)]
pub async fn create_account_with_token_fee(
    ledger: &dyn LedgerClient,
    transaction: Transaction,
    custody: &Keypair,
    max_signatures: usize,
    lamports_per_signature: u64,
    allowed_tokens: &[TokenFee],
    cache: &dyn Cache,
    same_source_timeout: Option<Duration>,
) -> Result<SignatureResponse, PipelineError> {
    let ctx = RequestContext::new("createAccountWithTokenFee");
    let result = run_create_account_with_token_fee(
        &ctx,
        ledger,
        transaction,
        custody,
        max_signatures,
        lamports_per_signature,
        allowed_tokens,
        cache,
        same_source_timeout.unwrap_or(DEFAULT_SAME_SOURCE_TIMEOUT),
    )
    .await;
    if let Err(error) = &result {
        ctx.rejected(error);
    }
    result
}

#[allow(clippy::too_many_arguments)]
async fn run_create_account_with_token_fee(
    ctx: &RequestContext,
    ledger: &dyn LedgerClient,
    mut transaction: Transaction,
    custody: &Keypair,
    max_signatures: usize,
    lamports_per_signature: u64,
    allowed_tokens: &[TokenFee],
    cache: &dyn Cache,
    same_source_timeout: Duration,
) -> Result<SignatureResponse, PipelineError> {
    replay::claim_transaction(cache, &transaction).await?;
    ctx.stage("dedup");

    let signed =
        envelope::validate_and_sign(&mut transaction, custody, max_signatures, lamports_per_signature)?;
    ctx.stage("envelope");

    account_init::validate_account_init(ledger, cache, &transaction).await?;
    ctx.stage("account_init");

    let transfer = transfer::validate_transfer(ledger, &transaction, allowed_tokens).await?;
    ctx.stage("transfer");

    replay::enforce_source_cooldown(
        cache,
        &replay::create_account_lockout_key(&transfer.source().pubkey),
        replay::now_ms(),
        same_source_timeout.as_millis() as u64,
    )
    .await?;
    ctx.stage("lockout");

    let outcome = simulate::simulate_raw(ledger, &signed.raw).await?;
    ctx.stage("simulation");

    let signature = signed.signature.to_string();
    ctx.signed(&signature, outcome.units_consumed);
    Ok(SignatureResponse { signature })
}
