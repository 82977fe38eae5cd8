//! Validation-and-signing pipeline
//!
//! The trust boundary of the service. A submitted transaction flows through
//! a fixed stage sequence:
//!
//! 1. **replay**: atomic dedup claim on the message fingerprint
//! 2. **envelope**: outer-shell checks, then custody partial-sign + serialize
//! 3. **drain** / **account_init**: structural validator, per entry point
//! 4. **transfer**: fee-transfer decoding and allow-list validation
//! 5. **replay**: per-source cooldown
//! 6. **simulate**: dry run of the signed bytes
//!
//! Data flows strictly downward; every stage can abort the run with one
//! discriminant from [`errors::PipelineError`] and nothing is rolled back.
//! The orchestrators in [`orchestrator`] are the only public entry points
//! that sequence these stages.

pub mod account_init;
pub mod drain;
pub mod envelope;
pub mod errors;
pub mod orchestrator;
pub mod replay;
pub mod simulate;
pub mod transfer;

pub use envelope::SignedTransaction;
pub use errors::{KeyRole, PipelineError};
pub use orchestrator::{
    create_account_with_token_fee, sign_with_token_fee, SignatureResponse,
    DEFAULT_SAME_SOURCE_TIMEOUT,
};
pub use transfer::{AccountRef, TransferIx};
