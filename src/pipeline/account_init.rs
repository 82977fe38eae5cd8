//! Associated-account creation validation
//!
//! The account-creation flow carries exactly two instructions: the fee
//! transfer, then an associated-token-account creation. The creation
//! instruction is never interpreted; it is compared byte-for-byte against a
//! reference instruction synthesized locally from the same derived address,
//! owner, and mint. Any deviation from the reference, down to a single role
//! flag or data byte, rejects the transaction.

use solana_sdk::{instruction::AccountMeta, transaction::Transaction};
use spl_associated_token_account::get_associated_token_address;

use crate::cache::Cache;
use crate::ledger::LedgerClient;
use crate::pipeline::errors::PipelineError;
use crate::pipeline::replay;

// Account positions in a create-associated-token-account instruction:
// [funder, associated_account, wallet, mint, system_program, token_program]
const WALLET_INDEX: usize = 2;
const MINT_INDEX: usize = 3;

/// Validate the second instruction as a canonical associated-account
/// creation, and mark it seen for this blockhash window.
///
/// The `account/<blockhash>_<ata>` cache key is written only after every
/// structural check passes, so a rejected transaction never poisons the
/// window for a later valid one.
pub async fn validate_account_init(
    ledger: &dyn LedgerClient,
    cache: &dyn Cache,
    transaction: &Transaction,
) -> Result<(), PipelineError> {
    let message = &transaction.message;
    if message.instructions.len() != 2 {
        return Err(PipelineError::InvalidInstructionCount);
    }

    let instruction = &message.instructions[1];
    let program = message
        .account_keys
        .get(instruction.program_id_index as usize)
        .ok_or(PipelineError::InvalidInstruction)?;
    if *program != spl_associated_token_account::id() {
        return Err(PipelineError::NotAssociatedTokenProgram);
    }

    // Re-derive the account references with header-derived flags.
    let mut actual_accounts = Vec::with_capacity(instruction.accounts.len());
    for &account_index in &instruction.accounts {
        let index = account_index as usize;
        let pubkey = *message
            .account_keys
            .get(index)
            .ok_or(PipelineError::InvalidInstruction)?;
        actual_accounts.push(AccountMeta {
            pubkey,
            is_signer: message.is_signer(index),
            is_writable: message.is_maybe_writable(index, None),
        });
    }

    let wallet = actual_accounts
        .get(WALLET_INDEX)
        .ok_or(PipelineError::UnmatchedAccountInstruction)?
        .pubkey;
    let mint = actual_accounts
        .get(MINT_INDEX)
        .ok_or(PipelineError::UnmatchedAccountInstruction)?
        .pubkey;

    let associated_account = get_associated_token_address(&wallet, &mint);
    if ledger.account_exists(&associated_account).await? {
        return Err(PipelineError::AccountAlreadyExists);
    }

    // The fee payer funds the account creation.
    let fee_payer = message
        .account_keys
        .first()
        .ok_or(PipelineError::InvalidFeePayer)?;
    let reference = spl_associated_token_account::instruction::create_associated_token_account(
        fee_payer,
        &wallet,
        &mint,
        &spl_token::id(),
    );

    if reference.data != instruction.data || reference.accounts != actual_accounts {
        return Err(PipelineError::UnmatchedAccountInstruction);
    }

    let key = replay::account_key(&message.recent_blockhash, &associated_account);
    if !cache.set_if_absent(&key, "1").await? {
        return Err(PipelineError::DuplicateAccount);
    }

    tracing::debug!(
        associated_account = %associated_account,
        wallet = %wallet,
        mint = %mint,
        "associated account creation validated"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::test_utils::{
        create_account_transaction, transfer_checked_transaction, MockLedger, TransferFixture,
    };
    use solana_sdk::pubkey::Pubkey;

    #[tokio::test]
    async fn test_valid_creation_passes_and_marks_window() {
        let fixture = TransferFixture::new();
        let wallet = Pubkey::new_unique();
        let new_mint = Pubkey::new_unique();
        let tx = create_account_transaction(&fixture, &wallet, &new_mint);
        let ledger = MockLedger::new().with_source(&fixture, fixture.token_fee.fee);
        let cache = MemoryCache::new();

        validate_account_init(&ledger, &cache, &tx).await.unwrap();

        let ata = get_associated_token_address(&wallet, &new_mint);
        let key = replay::account_key(&tx.message.recent_blockhash, &ata);
        assert_eq!(cache.get(&key).await.unwrap(), Some("1".to_string()));
    }

    #[tokio::test]
    async fn test_single_instruction_rejected() {
        let fixture = TransferFixture::new();
        let tx = transfer_checked_transaction(&fixture, fixture.token_fee.fee);
        let ledger = MockLedger::new();
        let cache = MemoryCache::new();

        let err = validate_account_init(&ledger, &cache, &tx).await.unwrap_err();
        assert!(matches!(err, PipelineError::InvalidInstructionCount));
    }

    #[tokio::test]
    async fn test_existing_account_rejected_without_marking() {
        let fixture = TransferFixture::new();
        let wallet = Pubkey::new_unique();
        let new_mint = Pubkey::new_unique();
        let ata = get_associated_token_address(&wallet, &new_mint);
        let tx = create_account_transaction(&fixture, &wallet, &new_mint);
        let ledger = MockLedger::new().with_existing_account(&ata);
        let cache = MemoryCache::new();

        let err = validate_account_init(&ledger, &cache, &tx).await.unwrap_err();
        assert!(matches!(err, PipelineError::AccountAlreadyExists));

        let key = replay::account_key(&tx.message.recent_blockhash, &ata);
        assert_eq!(cache.get(&key).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_duplicate_creation_in_same_blockhash_window_rejected() {
        let fixture = TransferFixture::new();
        let wallet = Pubkey::new_unique();
        let new_mint = Pubkey::new_unique();
        let tx = create_account_transaction(&fixture, &wallet, &new_mint);
        let ledger = MockLedger::new();
        let cache = MemoryCache::new();

        validate_account_init(&ledger, &cache, &tx).await.unwrap();
        let err = validate_account_init(&ledger, &cache, &tx).await.unwrap_err();
        assert!(matches!(err, PipelineError::DuplicateAccount));
    }

    #[tokio::test]
    async fn test_tampered_instruction_rejected() {
        let fixture = TransferFixture::new();
        let wallet = Pubkey::new_unique();
        let new_mint = Pubkey::new_unique();
        let mut tx = create_account_transaction(&fixture, &wallet, &new_mint);
        // Flip a data byte in the creation instruction.
        tx.message.instructions[1].data = vec![7];
        let ledger = MockLedger::new();
        let cache = MemoryCache::new();

        let err = validate_account_init(&ledger, &cache, &tx).await.unwrap_err();
        assert!(matches!(err, PipelineError::UnmatchedAccountInstruction));
    }

    #[tokio::test]
    async fn test_wrong_program_rejected() {
        let fixture = TransferFixture::new();
        let wallet = Pubkey::new_unique();
        let new_mint = Pubkey::new_unique();
        let mut tx = create_account_transaction(&fixture, &wallet, &new_mint);
        // Point the second instruction at the token program instead.
        let token_index = tx
            .message
            .account_keys
            .iter()
            .position(|key| *key == spl_token::id())
            .unwrap();
        tx.message.instructions[1].program_id_index = token_index as u8;
        let ledger = MockLedger::new();
        let cache = MemoryCache::new();

        let err = validate_account_init(&ledger, &cache, &tx).await.unwrap_err();
        assert!(matches!(err, PipelineError::NotAssociatedTokenProgram));
    }
}
