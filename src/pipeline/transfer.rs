//! Fee-transfer instruction validation
//!
//! Locates the single token-program instruction that pays the service's fee
//! and validates it against on-chain state and the configured allow-list.
//! The check order is a defense-in-depth sequence: existence, decoding,
//! balance/ownership, allow-list membership, fee sufficiency, then the role
//! flags of every account the instruction touches. Each step is independently
//! security-relevant; all of them run before the decoded result is trusted.

use solana_sdk::{message::Message, pubkey::Pubkey, transaction::Transaction};
use spl_token::instruction::TokenInstruction;

use crate::config::TokenFee;
use crate::ledger::LedgerClient;
use crate::pipeline::errors::PipelineError;

/// One account reference with its header-derived role flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountRef {
    pub pubkey: Pubkey,
    pub is_signer: bool,
    pub is_writable: bool,
}

/// Decoded fee-paying transfer, tagged by wire variant
///
/// The checked variant additionally asserts the mint identity and decimal
/// precision on-chain; both variants are otherwise validated identically.
#[derive(Debug, Clone)]
pub enum TransferIx {
    Plain {
        source: AccountRef,
        destination: AccountRef,
        authority: AccountRef,
        amount: u64,
    },
    Checked {
        source: AccountRef,
        mint: AccountRef,
        destination: AccountRef,
        authority: AccountRef,
        amount: u64,
        decimals: u8,
    },
}

impl TransferIx {
    pub fn source(&self) -> &AccountRef {
        match self {
            Self::Plain { source, .. } | Self::Checked { source, .. } => source,
        }
    }

    pub fn destination(&self) -> &AccountRef {
        match self {
            Self::Plain { destination, .. } | Self::Checked { destination, .. } => destination,
        }
    }

    pub fn authority(&self) -> &AccountRef {
        match self {
            Self::Plain { authority, .. } | Self::Checked { authority, .. } => authority,
        }
    }

    pub fn amount(&self) -> u64 {
        match self {
            Self::Plain { amount, .. } | Self::Checked { amount, .. } => *amount,
        }
    }
}

fn account_ref(message: &Message, index_byte: u8) -> Result<AccountRef, PipelineError> {
    let index = index_byte as usize;
    let pubkey = *message
        .account_keys
        .get(index)
        .ok_or(PipelineError::InvalidInstruction)?;
    Ok(AccountRef {
        pubkey,
        is_signer: message.is_signer(index),
        is_writable: message.is_maybe_writable(index, None),
    })
}

/// Decode the first token-program instruction into a [`TransferIx`].
///
/// Only the two transfer variants are accepted; any other token instruction,
/// a decode failure, or a short account list rejects the transaction.
#[allow(deprecated)] // TokenInstruction::Transfer is the legacy wire variant we must still accept
pub fn decode_transfer(transaction: &Transaction) -> Result<TransferIx, PipelineError> {
    let message = &transaction.message;
    let instruction = message
        .instructions
        .iter()
        .find(|ix| {
            message
                .account_keys
                .get(ix.program_id_index as usize)
                .is_some_and(|program| *program == spl_token::id())
        })
        .ok_or(PipelineError::MissingTokenInstruction)?;

    let decoded = TokenInstruction::unpack(&instruction.data)
        .map_err(|_| PipelineError::InvalidInstruction)?;

    match decoded {
        TokenInstruction::Transfer { amount } => {
            let [source, destination, authority] = instruction.accounts[..] else {
                return Err(PipelineError::InvalidInstruction);
            };
            Ok(TransferIx::Plain {
                source: account_ref(message, source)?,
                destination: account_ref(message, destination)?,
                authority: account_ref(message, authority)?,
                amount,
            })
        }
        TokenInstruction::TransferChecked { amount, decimals } => {
            let [source, mint, destination, authority] = instruction.accounts[..] else {
                return Err(PipelineError::InvalidInstruction);
            };
            Ok(TransferIx::Checked {
                source: account_ref(message, source)?,
                mint: account_ref(message, mint)?,
                destination: account_ref(message, destination)?,
                authority: account_ref(message, authority)?,
                amount,
                decimals,
            })
        }
        _ => Err(PipelineError::InvalidInstruction),
    }
}

/// Validate the fee-paying transfer against ledger state and the allow-list.
///
/// Returns the decoded instruction once every check passes. `allowed_tokens`
/// is matched on the source account's on-chain mint, not on anything the
/// instruction claims.
pub async fn validate_transfer(
    ledger: &dyn LedgerClient,
    transaction: &Transaction,
    allowed_tokens: &[TokenFee],
) -> Result<TransferIx, PipelineError> {
    let transfer = decode_transfer(transaction)?;

    let source = transfer.source();
    let authority = transfer.authority();
    let state = ledger.token_account(&source.pubkey).await?;

    if state.owner != authority.pubkey {
        return Err(PipelineError::SourceInvalidOwner);
    }
    if state.is_frozen {
        return Err(PipelineError::SourceFrozen);
    }
    if state.amount < transfer.amount() {
        return Err(PipelineError::SourceInsufficientBalance);
    }

    let fee = allowed_tokens
        .iter()
        .find(|token| token.mint == state.mint)
        .ok_or(PipelineError::InvalidToken)?;

    // Equality is sufficient; the payer must cover at least the fee.
    if transfer.amount() < fee.fee {
        return Err(PipelineError::InvalidAmount);
    }

    // The token account moves funds; its owner is the one who must sign.
    if source.is_signer {
        return Err(PipelineError::SourceIsSigner);
    }

    let destination = transfer.destination();
    if destination.pubkey != fee.account {
        return Err(PipelineError::InvalidDestination);
    }
    if !destination.is_writable {
        return Err(PipelineError::DestinationNotWritable);
    }
    if destination.is_signer {
        return Err(PipelineError::DestinationIsSigner);
    }

    // The authority must be the transaction's second signature slot: a
    // co-signer of the envelope, never the fee payer itself.
    match transaction.message.account_keys.get(1) {
        Some(second_signer) if *second_signer == authority.pubkey => {}
        _ => return Err(PipelineError::OwnerMissingSignature),
    }
    if authority.is_writable {
        return Err(PipelineError::OwnerIsWritable);
    }
    if !authority.is_signer {
        return Err(PipelineError::OwnerNotSigner);
    }

    if let TransferIx::Checked { mint, decimals, .. } = &transfer {
        if *decimals != fee.decimals {
            return Err(PipelineError::InvalidDecimals);
        }
        if mint.pubkey != fee.mint {
            return Err(PipelineError::InvalidMint);
        }
        if mint.is_writable {
            return Err(PipelineError::MintIsWritable);
        }
        if mint.is_signer {
            return Err(PipelineError::MintIsSigner);
        }
    }

    Ok(transfer)
}
