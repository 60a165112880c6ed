//! Ledger record definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use wayline_protocols::types::{ExecutionStatus, ReasonCode};

/// The committed state of an execution at one point in its chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ExecutionState {
    /// Recorded but not yet dispatched.
    Pending,
    /// An orchestrator is advancing the execution.
    Running,
    /// A step is about to execute its side effect.
    StepStarted { intent_id: String },
    /// A step completed its side effect.
    StepCompleted { intent_id: String },
    /// Terminal: completed successfully.
    Succeeded,
    /// Terminal: failed with a recorded reason.
    Failed { reason: ReasonCode },
    /// Terminal: cancelled.
    Cancelled,
}

impl ExecutionState {
    /// Terminal states are absorbing.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionState::Succeeded | ExecutionState::Failed { .. } | ExecutionState::Cancelled
        )
    }

    /// Coarse status for status queries.
    pub fn status(&self) -> ExecutionStatus {
        match self {
            ExecutionState::Pending => ExecutionStatus::Pending,
            ExecutionState::Running
            | ExecutionState::StepStarted { .. }
            | ExecutionState::StepCompleted { .. } => ExecutionStatus::Running,
            ExecutionState::Succeeded => ExecutionStatus::Succeeded,
            ExecutionState::Failed { .. } => ExecutionStatus::Failed,
            ExecutionState::Cancelled => ExecutionStatus::Cancelled,
        }
    }

    /// Machine-readable reason for non-success terminal states.
    pub fn reason(&self) -> Option<ReasonCode> {
        match self {
            ExecutionState::Failed { reason } => Some(*reason),
            ExecutionState::Cancelled => Some(ReasonCode::Cancelled),
            _ => None,
        }
    }
}

/// An entry in the ledger. Only ever appended, never modified or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateRecord {
    /// Execution the record belongs to.
    pub execution_id: Uuid,

    /// Position in the execution's chain, contiguous from 0.
    pub sequence_no: u64,

    /// State the execution was in before this transition. `None` only for
    /// the genesis record.
    pub prior_state: Option<ExecutionState>,

    /// State committed by this transition.
    pub new_state: ExecutionState,

    /// Component that proposed the transition.
    pub actor: String,

    /// Digest of the payload carried across this transition, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_hash: Option<String>,

    /// Key making retried proposals idempotent.
    pub idempotency_key: String,

    /// Commit time.
    pub recorded_at: DateTime<Utc>,
}

/// A proposed transition, not yet committed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionProposal {
    pub execution_id: Uuid,
    pub sequence_no: u64,
    pub prior_state: Option<ExecutionState>,
    pub new_state: ExecutionState,
    pub actor: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_hash: Option<String>,
    pub idempotency_key: String,
}

impl TransitionProposal {
    /// Create a new proposal. The idempotency key defaults to a fresh value:
    /// retries of the same proposal instance share it, distinct proposals do
    /// not.
    pub fn new(
        execution_id: Uuid,
        sequence_no: u64,
        prior_state: Option<ExecutionState>,
        new_state: ExecutionState,
        actor: impl Into<String>,
    ) -> Self {
        Self {
            execution_id,
            sequence_no,
            prior_state,
            new_state,
            actor: actor.into(),
            payload_hash: None,
            idempotency_key: Uuid::new_v4().to_string(),
        }
    }

    /// The first record of an execution: sequence 0, no prior state.
    pub fn genesis(execution_id: Uuid, actor: impl Into<String>) -> Self {
        Self::new(execution_id, 0, None, ExecutionState::Pending, actor)
            .with_idempotency_key(format!("{}:genesis", execution_id))
    }

    /// Set the payload digest.
    pub fn with_payload_hash(mut self, hash: impl Into<String>) -> Self {
        self.payload_hash = Some(hash.into());
        self
    }

    /// Set a stable idempotency key.
    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = key.into();
        self
    }

    /// Stamp the proposal into a committable record.
    pub fn into_record(self) -> StateRecord {
        StateRecord {
            execution_id: self.execution_id,
            sequence_no: self.sequence_no,
            prior_state: self.prior_state,
            new_state: self.new_state,
            actor: self.actor,
            payload_hash: self.payload_hash,
            idempotency_key: self.idempotency_key,
            recorded_at: Utc::now(),
        }
    }
}
