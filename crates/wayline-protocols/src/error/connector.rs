//! Connector errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("Connector not found: {0}")]
    NotFound(String),

    #[error("Connector {connector_id} does not support action: {action}")]
    UnknownAction {
        connector_id: String,
        action: String,
    },

    #[error("Action execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Connector timed out after {0} seconds")]
    Timeout(u64),

    #[error("Connector was cancelled")]
    Cancelled,
}
