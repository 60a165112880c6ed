//! Agent errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Agent not found: {0}")]
    NotFound(String),

    #[error("Proposal failed: {0}")]
    ProposalFailed(String),

    #[error("Agent timed out after {0} seconds")]
    Timeout(u64),

    #[error("Agent was cancelled")]
    Cancelled,
}
