//! Common utility types.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Unique identifier type for contract entities.
pub type Id = String;

/// Metadata map type.
pub type Metadata = HashMap<String, serde_json::Value>;

/// Coarse status of one execution, derived from the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Recorded but not yet dispatched.
    Pending,
    /// Being advanced by an orchestrator.
    Running,
    /// Completed successfully.
    Succeeded,
    /// Completed with a recorded failure reason.
    Failed,
    /// Cancelled before completion.
    Cancelled,
}

impl ExecutionStatus {
    /// Terminal statuses are absorbing: no further transition is accepted.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionStatus::Succeeded | ExecutionStatus::Failed | ExecutionStatus::Cancelled
        )
    }
}

/// Machine-readable reason attached to every non-success terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    /// No orchestrator registered for the journey type, or unknown contract.
    ContractResolution,
    /// A proposed action fell outside an intent's declared capability set.
    CapabilityViolation,
    /// The execution exceeded its configured deadline.
    OrchestratorTimeout,
    /// An agent failed to produce a proposal.
    AgentFailure,
    /// A connector action failed or timed out.
    ConnectorFailure,
    /// A ledger ordering violation was detected.
    SequenceConflict,
    /// The ledger persistence layer stayed unavailable through retries.
    StorageUnavailable,
    /// The execution was cancelled.
    Cancelled,
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ReasonCode::ContractResolution => "contract_resolution",
            ReasonCode::CapabilityViolation => "capability_violation",
            ReasonCode::OrchestratorTimeout => "orchestrator_timeout",
            ReasonCode::AgentFailure => "agent_failure",
            ReasonCode::ConnectorFailure => "connector_failure",
            ReasonCode::SequenceConflict => "sequence_conflict",
            ReasonCode::StorageUnavailable => "storage_unavailable",
            ReasonCode::Cancelled => "cancelled",
        };
        write!(f, "{}", s)
    }
}

/// Hash a JSON payload into a lowercase hex digest.
///
/// Used for the `payload_hash` carried by ledger records: the ledger stores
/// the digest of what was about to run / what came back, not the payload
/// itself.
pub fn hash_payload(value: &serde_json::Value) -> String {
    let bytes = serde_json::to_vec(value).unwrap_or_default();
    let digest = Sha256::digest(&bytes);
    digest.iter().fold(String::with_capacity(64), |mut acc, b| {
        use std::fmt::Write;
        let _ = write!(acc, "{:02x}", b);
        acc
    })
}
