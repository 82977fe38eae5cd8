//! Request correlation and tracing setup
//!
//! Each pipeline run carries a [`RequestContext`] that stamps every emitted
//! event with a correlation id and the operation name. The context is injected
//! down the pipeline instead of living in a global, so concurrent requests
//! never share logging state.

use uuid::Uuid;

use crate::pipeline::PipelineError;

/// Request-scoped logging context for one pipeline run
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: String,
    operation: &'static str,
}

impl RequestContext {
    pub fn new(operation: &'static str) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            operation,
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    /// A stage finished without rejecting the transaction.
    pub fn stage(&self, stage: &str) {
        tracing::debug!(
            request_id = %self.request_id,
            operation = %self.operation,
            stage = %stage,
            "pipeline stage passed"
        );
    }

    /// The pipeline rejected the transaction or hit an infrastructure fault.
    pub fn rejected(&self, error: &PipelineError) {
        if error.is_infrastructure() {
            tracing::error!(
                request_id = %self.request_id,
                operation = %self.operation,
                category = %error.category(),
                error = %error,
                "pipeline infrastructure failure"
            );
        } else {
            tracing::warn!(
                request_id = %self.request_id,
                operation = %self.operation,
                category = %error.category(),
                error = %error,
                "transaction rejected"
            );
        }
    }

    /// The custody signature was produced and the dry run passed.
    pub fn signed(&self, signature: &str, units_consumed: Option<u64>) {
        tracing::info!(
            request_id = %self.request_id,
            operation = %self.operation,
            signature = %signature,
            units_consumed = ?units_consumed,
            "transaction co-signed"
        );
    }
}

/// Install the global tracing subscriber with env-filter control.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
