//! Transaction envelope validation and custody signing
//!
//! Checks the outer shell of a submitted transaction before anything looks at
//! its instructions: the custody key must be the declared fee payer, every
//! secondary signer must have already signed, and slot zero must still be
//! empty so the custody signature is the only thing this service adds. Only
//! when all checks pass is the transaction partial-signed and serialized; a
//! failure at any step leaves it untouched.

use solana_sdk::{
    hash::Hash,
    signature::{Keypair, Signature, Signer},
    transaction::Transaction,
};

use crate::pipeline::errors::PipelineError;

/// Output of a successful envelope validation: the custody signature and the
/// fully-signed wire bytes.
#[derive(Debug, Clone)]
pub struct SignedTransaction {
    pub signature: Signature,
    pub raw: Vec<u8>,
}

/// Validate the envelope, then attach the custody signature and serialize.
///
/// Checks run in a fixed order; the first violation aborts with its own
/// discriminant and no partial signing is applied. `lamports_per_signature`
/// is the configured network-fee ceiling; it is recorded for observability
/// and consumed by the API layer's fee quoting, not by a check here.
pub fn validate_and_sign(
    transaction: &mut Transaction,
    custody: &Keypair,
    max_signatures: usize,
    lamports_per_signature: u64,
) -> Result<SignedTransaction, PipelineError> {
    let custody_pubkey = custody.pubkey();

    // (1) Declared fee payer is the custody key.
    match transaction.message.account_keys.first() {
        Some(fee_payer) if *fee_payer == custody_pubkey => {}
        _ => return Err(PipelineError::InvalidFeePayer),
    }

    // (2) A recent blockhash is present.
    if transaction.message.recent_blockhash == Hash::default() {
        return Err(PipelineError::MissingRecentBlockhash);
    }

    // (3) Signature slot count is within bounds.
    if transaction.signatures.is_empty() {
        return Err(PipelineError::NoSignatures);
    }
    if transaction.signatures.len() > max_signatures {
        return Err(PipelineError::TooManySignatures);
    }

    // (4) Slot zero is still unsigned. The key behind slot zero is
    // `account_keys[0]`, already pinned to the custody key by check (1).
    // A pre-filled slot zero means someone already signed as the fee payer,
    // which is either double-signing or a signature-slot confusion attempt.
    if transaction.signatures[0] != Signature::default() {
        return Err(PipelineError::InvalidFeePayerSignature);
    }

    // (5) Every remaining required slot has a key and a signature.
    for index in 1..transaction.signatures.len() {
        match transaction.message.account_keys.get(index) {
            Some(pubkey) if *pubkey != solana_sdk::pubkey::Pubkey::default() => {}
            _ => return Err(PipelineError::MissingPublicKey),
        }
        if transaction.signatures[index] == Signature::default() {
            return Err(PipelineError::MissingSignature);
        }
    }

    let recent_blockhash = transaction.message.recent_blockhash;
    transaction
        .try_partial_sign(&[custody], recent_blockhash)
        .map_err(|e| PipelineError::Signing(e.to_string()))?;

    let raw = bincode::serialize(&*transaction)
        .map_err(|e| PipelineError::Serialization(e.to_string()))?;
    let signature = transaction.signatures[0];

    tracing::debug!(
        signature = %signature,
        signatures = transaction.signatures.len(),
        lamports_per_signature,
        raw_len = raw.len(),
        "transaction envelope validated and signed"
    );

    Ok(SignedTransaction { signature, raw })
}
