//! Orchestrator errors.

use thiserror::Error;

use wayline_ledger::LedgerError;
use wayline_protocols::error::{AgentError, ConnectorError, ContractError};
use wayline_protocols::types::ReasonCode;

/// Orchestrator error types.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// A proposal fell outside the intent's declared capability set. Never
    /// retried and never reaches a connector.
    #[error("Intent {intent_id} proposed out-of-contract action {connector_id}/{action}")]
    CapabilityViolation {
        intent_id: String,
        connector_id: String,
        action: String,
    },

    /// Agent failure.
    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),

    /// Connector failure.
    #[error("Connector error: {0}")]
    Connector(#[from] ConnectorError),

    /// Ledger rejection or storage failure.
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// A connector action exceeded the step timeout.
    #[error("Intent {intent_id} timed out after {seconds} seconds")]
    StepTimeout { intent_id: String, seconds: u64 },

    /// The execution was cancelled at an intent boundary.
    #[error("Execution was cancelled")]
    Cancelled,

    /// The intent graph is invalid.
    #[error("Contract error: {0}")]
    Contract(#[from] ContractError),

    /// A step task failed outside its own error path.
    #[error("Step task failed: {0}")]
    Internal(String),
}

impl OrchestratorError {
    /// The machine-readable reason recorded when this error terminates an
    /// execution.
    pub fn reason(&self) -> ReasonCode {
        match self {
            OrchestratorError::CapabilityViolation { .. } => ReasonCode::CapabilityViolation,
            OrchestratorError::Agent(_) => ReasonCode::AgentFailure,
            OrchestratorError::Connector(_) => ReasonCode::ConnectorFailure,
            OrchestratorError::Ledger(LedgerError::StorageUnavailable(_))
            | OrchestratorError::Ledger(LedgerError::Io(_)) => ReasonCode::StorageUnavailable,
            OrchestratorError::Ledger(_) => ReasonCode::SequenceConflict,
            OrchestratorError::StepTimeout { .. } => ReasonCode::ConnectorFailure,
            OrchestratorError::Cancelled => ReasonCode::Cancelled,
            OrchestratorError::Contract(_) => ReasonCode::ContractResolution,
            OrchestratorError::Internal(_) => ReasonCode::ConnectorFailure,
        }
    }

    /// Whether a declared fallback intent may run in place of the failed
    /// step. Capability and sequence violations are contract errors and are
    /// never recovered.
    pub fn fallback_eligible(&self) -> bool {
        matches!(
            self,
            OrchestratorError::Agent(_)
                | OrchestratorError::Connector(_)
                | OrchestratorError::StepTimeout { .. }
        )
    }
}
