//! Pre-broadcast simulation gate
//!
//! The last stage before the signature is released: run the fully-signed
//! transaction speculatively and refuse to hand out the signature if the dry
//! run fails. The transaction is rebuilt from the raw bytes rather than
//! reusing the in-memory object, so nothing a downstream library mutated can
//! leak into what actually gets simulated.

use solana_sdk::transaction::Transaction;

use crate::ledger::{LedgerClient, SimulationOutcome};
use crate::pipeline::errors::PipelineError;

/// Dry-run the signed wire bytes; reject on any simulated execution error.
///
/// Returns the simulation metadata (compute units consumed) for logging.
pub async fn simulate_raw(
    ledger: &dyn LedgerClient,
    raw: &[u8],
) -> Result<SimulationOutcome, PipelineError> {
    let transaction: Transaction =
        bincode::deserialize(raw).map_err(|e| PipelineError::Serialization(e.to_string()))?;

    let outcome = ledger.simulate(&transaction).await?;
    if let Some(error) = &outcome.error {
        return Err(PipelineError::Simulation(error.clone()));
    }

    tracing::debug!(
        units_consumed = ?outcome.units_consumed,
        "simulation passed"
    );
    Ok(outcome)
}
