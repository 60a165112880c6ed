//! Serialized ledger commits for one orchestrator run.

use std::sync::Arc;

use tokio::sync::Mutex;
use uuid::Uuid;

use wayline_ledger::{
    ExecutionState, LedgerError, StateRecord, StateSurface, TransitionProposal,
};

/// Tracks the head of one execution's chain so concurrent step tasks can
/// commit in a total order.
///
/// Connector actions from independent branches run concurrently; only their
/// ledger commits serialize through this cursor.
pub struct LedgerCursor {
    surface: Arc<StateSurface>,
    execution_id: Uuid,
    actor: String,
    head: Mutex<(u64, ExecutionState)>,
}

impl LedgerCursor {
    /// Load the cursor from the committed chain. The chain must already hold
    /// at least the genesis record.
    pub async fn load(
        surface: Arc<StateSurface>,
        execution_id: Uuid,
        actor: impl Into<String>,
    ) -> Result<Self, LedgerError> {
        let records = surface.read(&execution_id).await?;
        let last = records
            .last()
            .ok_or_else(|| LedgerError::SequenceConflict {
                execution_id,
                detail: "no genesis record committed".to_string(),
            })?;

        Ok(Self {
            surface,
            execution_id,
            actor: actor.into(),
            head: Mutex::new((last.sequence_no + 1, last.new_state.clone())),
        })
    }

    /// Commit a transition at the current head.
    ///
    /// An idempotency-key hit (replay after a crash) returns the previously
    /// committed record without moving the head backwards.
    pub async fn commit(
        &self,
        new_state: ExecutionState,
        payload_hash: Option<String>,
        idempotency_key: String,
    ) -> Result<StateRecord, LedgerError> {
        let mut head = self.head.lock().await;

        let mut proposal = TransitionProposal::new(
            self.execution_id,
            head.0,
            Some(head.1.clone()),
            new_state,
            self.actor.clone(),
        )
        .with_idempotency_key(idempotency_key);
        if let Some(hash) = payload_hash {
            proposal = proposal.with_payload_hash(hash);
        }

        let record = self.surface.propose(proposal).await?;

        if record.sequence_no + 1 >= head.0 {
            *head = (record.sequence_no + 1, record.new_state.clone());
        }

        Ok(record)
    }

    /// The execution this cursor writes for.
    pub fn execution_id(&self) -> Uuid {
        self.execution_id
    }
}
