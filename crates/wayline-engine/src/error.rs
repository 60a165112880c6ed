//! Engine errors.

use thiserror::Error;
use uuid::Uuid;

use wayline_ledger::LedgerError;

/// Engine error types.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The submission could not be resolved to a published journey and a
    /// registered orchestrator.
    #[error("Contract resolution failed: {0}")]
    ContractResolution(String),

    /// An orchestrator factory is already registered for the journey type.
    #[error("Orchestrator already registered for journey type: {0}")]
    AlreadyRegistered(String),

    /// No ledger records exist for the execution.
    #[error("Execution not found: {0}")]
    ExecutionNotFound(Uuid),

    /// Ledger failure.
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_resolution_display() {
        let err = EngineError::ContractResolution("journey j9 not found".to_string());
        assert!(err.to_string().contains("j9"));
    }

    #[test]
    fn test_ledger_error_conversion() {
        let err: EngineError = LedgerError::StorageUnavailable("down".to_string()).into();
        assert!(matches!(err, EngineError::Ledger(_)));
    }
}
