//! Deriving execution views by replaying the ledger.
//!
//! Recovery and status queries fold the committed chain; no component keeps
//! a divergent private copy of execution state.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use uuid::Uuid;

use wayline_protocols::types::{ExecutionStatus, ReasonCode};

use crate::record::{ExecutionState, StateRecord};

/// The canonical view of one execution, derived from its record chain.
#[derive(Debug, Clone)]
pub struct ExecutionView {
    /// Execution id.
    pub execution_id: Uuid,

    /// Coarse status.
    pub status: ExecutionStatus,

    /// Reason for a non-success terminal status.
    pub reason: Option<ReasonCode>,

    /// Number of committed records.
    pub record_count: usize,

    /// Intents whose completion is committed. The resume frontier: on
    /// restart an orchestrator skips these.
    pub completed_intents: HashSet<String>,

    /// Intents with a committed start but no committed completion.
    pub started_intents: HashSet<String>,

    /// Sequence number of the last committed record.
    pub last_sequence: u64,

    /// When the execution was created.
    pub created_at: DateTime<Utc>,

    /// When the last record was committed.
    pub updated_at: DateTime<Utc>,
}

impl ExecutionView {
    /// Fold an ordered record chain into a view. Returns `None` for an empty
    /// chain.
    pub fn replay(records: &[StateRecord]) -> Option<Self> {
        let first = records.first()?;
        let last = records.last()?;

        let mut completed = HashSet::new();
        let mut started = HashSet::new();

        for record in records {
            match &record.new_state {
                ExecutionState::StepStarted { intent_id } => {
                    started.insert(intent_id.clone());
                }
                ExecutionState::StepCompleted { intent_id } => {
                    started.remove(intent_id);
                    completed.insert(intent_id.clone());
                }
                _ => {}
            }
        }

        Some(Self {
            execution_id: first.execution_id,
            status: last.new_state.status(),
            reason: last.new_state.reason(),
            record_count: records.len(),
            completed_intents: completed,
            started_intents: started,
            last_sequence: last.sequence_no,
            created_at: first.recorded_at,
            updated_at: last.recorded_at,
        })
    }

    /// Whether the execution reached a terminal status.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// The next sequence number to propose.
    pub fn next_sequence(&self) -> u64 {
        self.last_sequence + 1
    }
}
