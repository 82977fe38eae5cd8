//! Error taxonomy for the validation-and-signing pipeline
//!
//! Every rejection condition maps to exactly one variant with a stable
//! discriminant string; the API layer surfaces these verbatim. Errors are
//! flat on purpose: the first violated condition aborts the request, nothing
//! accumulates, nothing is retried here. Infrastructure faults (ledger, cache,
//! signing machinery) are separate variants so operators can tell a bad
//! transaction from a broken backend.

use thiserror::Error;

use crate::cache::CacheError;
use crate::ledger::LedgerError;

/// Which role flag exposed the custody key inside an instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyRole {
    Writable,
    Signer,
}

impl std::fmt::Display for KeyRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Writable => write!(f, "writable"),
            Self::Signer => write!(f, "signer"),
        }
    }
}

/// One variant per rejection condition, plus infrastructure wrappers
#[derive(Debug, Error)]
pub enum PipelineError {
    // Envelope checks
    #[error("invalid fee payer")]
    InvalidFeePayer,
    #[error("missing recent blockhash")]
    MissingRecentBlockhash,
    #[error("no signatures")]
    NoSignatures,
    #[error("too many signatures")]
    TooManySignatures,
    /// Part of the stable discriminant set. With [`solana_sdk::transaction::Transaction`]
    /// the declared fee payer and slot zero's key are the same field, so the
    /// envelope reports such mismatches as [`Self::InvalidFeePayer`].
    #[error("invalid fee payer pubkey")]
    InvalidFeePayerPubkey,
    #[error("invalid fee payer signature")]
    InvalidFeePayerSignature,
    #[error("missing public key")]
    MissingPublicKey,
    #[error("missing signature")]
    MissingSignature,

    /// The custody key appeared as writable or signer inside an instruction
    /// (a fee-payer-drain attempt). The offending role is carried for logs.
    #[error("invalid account")]
    InvalidAccount { role: KeyRole },

    // Fee-transfer checks
    #[error("missing token instruction")]
    MissingTokenInstruction,
    #[error("invalid instruction")]
    InvalidInstruction,
    #[error("source invalid owner")]
    SourceInvalidOwner,
    #[error("source frozen")]
    SourceFrozen,
    #[error("source insufficient balance")]
    SourceInsufficientBalance,
    #[error("invalid token")]
    InvalidToken,
    #[error("invalid amount")]
    InvalidAmount,
    #[error("source is signer")]
    SourceIsSigner,
    #[error("invalid destination")]
    InvalidDestination,
    #[error("destination not writable")]
    DestinationNotWritable,
    #[error("destination is signer")]
    DestinationIsSigner,
    #[error("owner missing signature")]
    OwnerMissingSignature,
    #[error("owner is writable")]
    OwnerIsWritable,
    #[error("owner not signer")]
    OwnerNotSigner,
    #[error("invalid decimals")]
    InvalidDecimals,
    #[error("invalid mint")]
    InvalidMint,
    #[error("mint is writable")]
    MintIsWritable,
    #[error("mint is signer")]
    MintIsSigner,

    // Account-initialization checks
    #[error("transaction should contain 2 instructions: transfer fee & create account")]
    InvalidInstructionCount,
    #[error("account instruction should call associated token program")]
    NotAssociatedTokenProgram,
    #[error("account already exists")]
    AccountAlreadyExists,
    #[error("unable to match associated account instruction")]
    UnmatchedAccountInstruction,
    #[error("duplicate account within same recent blockhash")]
    DuplicateAccount,

    // Replay / lockout
    #[error("duplicate transaction")]
    DuplicateTransaction,
    #[error("duplicate transfer")]
    DuplicateTransfer,

    /// The dry run reported an execution error
    #[error("Simulation error: {0}")]
    Simulation(String),

    // Infrastructure faults, distinct from the rejection taxonomy
    #[error("signing failed: {0}")]
    Signing(String),
    #[error("serialization failed: {0}")]
    Serialization(String),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl PipelineError {
    /// Pipeline stage the error belongs to, for logs and metrics labels.
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidFeePayer
            | Self::MissingRecentBlockhash
            | Self::NoSignatures
            | Self::TooManySignatures
            | Self::InvalidFeePayerPubkey
            | Self::InvalidFeePayerSignature
            | Self::MissingPublicKey
            | Self::MissingSignature => "envelope",

            Self::InvalidAccount { .. } => "drain",

            Self::MissingTokenInstruction
            | Self::InvalidInstruction
            | Self::SourceInvalidOwner
            | Self::SourceFrozen
            | Self::SourceInsufficientBalance
            | Self::InvalidToken
            | Self::InvalidAmount
            | Self::SourceIsSigner
            | Self::InvalidDestination
            | Self::DestinationNotWritable
            | Self::DestinationIsSigner
            | Self::OwnerMissingSignature
            | Self::OwnerIsWritable
            | Self::OwnerNotSigner
            | Self::InvalidDecimals
            | Self::InvalidMint
            | Self::MintIsWritable
            | Self::MintIsSigner => "transfer",

            Self::InvalidInstructionCount
            | Self::NotAssociatedTokenProgram
            | Self::AccountAlreadyExists
            | Self::UnmatchedAccountInstruction
            | Self::DuplicateAccount => "account",

            Self::DuplicateTransaction | Self::DuplicateTransfer => "replay",

            Self::Simulation(_) => "simulation",

            Self::Signing(_) => "signing",
            Self::Serialization(_) => "serialization",
            Self::Ledger(_) => "ledger",
            Self::Cache(_) => "cache",
        }
    }

    /// True when the failure is an operational problem rather than a
    /// rejection of the submitted transaction.
    pub fn is_infrastructure(&self) -> bool {
        match self {
            // A missing source account means the submitter referenced an
            // account that does not exist; that is a rejection, not an outage.
            Self::Ledger(LedgerError::AccountNotFound(_)) => false,
            Self::Signing(_) | Self::Serialization(_) | Self::Ledger(_) | Self::Cache(_) => true,
            _ => false,
        }
    }
}
