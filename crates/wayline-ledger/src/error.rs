//! Ledger errors.

use thiserror::Error;
use uuid::Uuid;

/// Ledger error types.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Proposed sequence number or prior state does not match the committed
    /// chain. Never retried: this is a contract error.
    #[error("Sequence conflict for execution {execution_id}: {detail}")]
    SequenceConflict { execution_id: Uuid, detail: String },

    /// The execution already reached a terminal state.
    #[error("Execution {0} is terminal; no further transitions accepted")]
    TerminalState(Uuid),

    /// The persistence layer is unavailable. Retried with bounded backoff.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Record serialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LedgerError {
    /// Transient errors worth retrying locally.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LedgerError::StorageUnavailable(_) | LedgerError::Io(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable() {
        assert!(LedgerError::StorageUnavailable("down".to_string()).is_retryable());
        assert!(!LedgerError::TerminalState(Uuid::new_v4()).is_retryable());
        assert!(!LedgerError::SequenceConflict {
            execution_id: Uuid::new_v4(),
            detail: "expected 1".to_string(),
        }
        .is_retryable());
    }
}
