use super::*;
use crate::record::TransitionProposal;
use crate::store::MemoryLedgerStore;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio_stream::StreamExt;
use wayline_protocols::types::ReasonCode;

fn surface() -> (Arc<StateSurface>, Arc<MemoryLedgerStore>) {
    let store = Arc::new(MemoryLedgerStore::new());
    let surface = Arc::new(StateSurface::new(store.clone(), LedgerConfig::default()));
    (surface, store)
}

async fn commit_prefix(surface: &StateSurface, id: Uuid) {
    surface
        .propose(TransitionProposal::genesis(id, "engine"))
        .await
        .unwrap();
    surface
        .propose(TransitionProposal::new(
            id,
            1,
            Some(ExecutionState::Pending),
            ExecutionState::Running,
            "engine",
        ))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_propose_contiguous_chain() {
    let (surface, _) = surface();
    let id = Uuid::new_v4();
    commit_prefix(&surface, id).await;

    let records = surface.read(&id).await.unwrap();
    assert_eq!(records.len(), 2);
    for (i, record) in records.iter().enumerate() {
        assert_eq!(record.sequence_no, i as u64);
    }
}

#[tokio::test]
async fn test_propose_rejects_sequence_gap() {
    let (surface, _) = surface();
    let id = Uuid::new_v4();
    commit_prefix(&surface, id).await;

    let result = surface
        .propose(TransitionProposal::new(
            id,
            5,
            Some(ExecutionState::Running),
            ExecutionState::Succeeded,
            "engine",
        ))
        .await;
    assert!(matches!(
        result,
        Err(LedgerError::SequenceConflict { .. })
    ));

    // The chain did not advance.
    assert_eq!(surface.read(&id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_propose_rejects_prior_state_mismatch() {
    let (surface, _) = surface();
    let id = Uuid::new_v4();
    commit_prefix(&surface, id).await;

    let result = surface
        .propose(TransitionProposal::new(
            id,
            2,
            Some(ExecutionState::Pending),
            ExecutionState::Succeeded,
            "engine",
        ))
        .await;
    assert!(matches!(
        result,
        Err(LedgerError::SequenceConflict { .. })
    ));
}

#[tokio::test]
async fn test_idempotent_propose_returns_same_record() {
    let (surface, _) = surface();
    let id = Uuid::new_v4();
    commit_prefix(&surface, id).await;

    let proposal = TransitionProposal::new(
        id,
        2,
        Some(ExecutionState::Running),
        ExecutionState::StepStarted {
            intent_id: "i1".to_string(),
        },
        "orchestrator",
    )
    .with_idempotency_key(format!("{}:i1:pre", id));

    let first = surface.propose(proposal.clone()).await.unwrap();
    let second = surface.propose(proposal).await.unwrap();

    assert_eq!(first.sequence_no, second.sequence_no);
    assert_eq!(first.recorded_at, second.recorded_at);
    assert_eq!(first.idempotency_key, second.idempotency_key);

    // The chain did not advance or duplicate.
    assert_eq!(surface.read(&id).await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_terminal_state_absorbing() {
    let (surface, _) = surface();
    let id = Uuid::new_v4();
    commit_prefix(&surface, id).await;

    surface
        .propose(TransitionProposal::new(
            id,
            2,
            Some(ExecutionState::Running),
            ExecutionState::Failed {
                reason: ReasonCode::ConnectorFailure,
            },
            "engine",
        ))
        .await
        .unwrap();

    let result = surface
        .propose(TransitionProposal::new(
            id,
            3,
            Some(ExecutionState::Failed {
                reason: ReasonCode::ConnectorFailure,
            }),
            ExecutionState::Succeeded,
            "engine",
        ))
        .await;
    assert!(matches!(result, Err(LedgerError::TerminalState(_))));

    let view = surface.view(&id).await.unwrap().unwrap();
    assert_eq!(view.reason, Some(ReasonCode::ConnectorFailure));
}

#[tokio::test]
async fn test_concurrent_same_proposal_commits_once() {
    // Simulated crash/restart: a fresh surface over the same store, then two
    // concurrent retries of the same transition.
    let store = Arc::new(MemoryLedgerStore::new());
    let id = Uuid::new_v4();
    let pre_crash = StateSurface::new(store.clone(), LedgerConfig::default());
    commit_prefix(&pre_crash, id).await;
    pre_crash
        .propose(
            TransitionProposal::new(
                id,
                2,
                Some(ExecutionState::Running),
                ExecutionState::StepStarted {
                    intent_id: "i1".to_string(),
                },
                "orchestrator",
            )
            .with_idempotency_key(format!("{}:i1:pre", id)),
        )
        .await
        .unwrap();

    let surface = Arc::new(StateSurface::new(store.clone(), LedgerConfig::default()));
    let proposal = TransitionProposal::new(
        id,
        3,
        Some(ExecutionState::StepStarted {
            intent_id: "i1".to_string(),
        }),
        ExecutionState::StepCompleted {
            intent_id: "i1".to_string(),
        },
        "orchestrator",
    )
    .with_payload_hash("deadbeef")
    .with_idempotency_key(format!("{}:i1:post", id));

    let a = {
        let surface = surface.clone();
        let proposal = proposal.clone();
        tokio::spawn(async move { surface.propose(proposal).await })
    };
    let b = {
        let surface = surface.clone();
        let proposal = proposal.clone();
        tokio::spawn(async move { surface.propose(proposal).await })
    };

    let record_a = a.await.unwrap().unwrap();
    let record_b = b.await.unwrap().unwrap();

    assert_eq!(record_a.sequence_no, 3);
    assert_eq!(record_a.sequence_no, record_b.sequence_no);
    assert_eq!(record_a.recorded_at, record_b.recorded_at);

    // Exactly one record at sequence 3.
    let records = surface.read(&id).await.unwrap();
    assert_eq!(records.len(), 4);
    assert_eq!(
        records.iter().filter(|r| r.sequence_no == 3).count(),
        1
    );
}

#[tokio::test]
async fn test_hydrate_after_restart_continues_chain() {
    let store = Arc::new(MemoryLedgerStore::new());
    let id = Uuid::new_v4();

    let before = StateSurface::new(store.clone(), LedgerConfig::default());
    commit_prefix(&before, id).await;
    drop(before);

    let after = StateSurface::new(store.clone(), LedgerConfig::default());
    let record = after
        .propose(TransitionProposal::new(
            id,
            2,
            Some(ExecutionState::Running),
            ExecutionState::Succeeded,
            "engine",
        ))
        .await
        .unwrap();
    assert_eq!(record.sequence_no, 2);
}

#[tokio::test]
async fn test_subscribe_delivers_live_records() {
    let (surface, _) = surface();
    let id = Uuid::new_v4();

    let mut stream = surface.subscribe(id);
    commit_prefix(&surface, id).await;

    let first = stream.next().await.unwrap().unwrap();
    assert_eq!(first.sequence_no, 0);
    let second = stream.next().await.unwrap().unwrap();
    assert_eq!(second.sequence_no, 1);
}

/// Store that fails a fixed number of appends before recovering.
struct FlakyStore {
    inner: MemoryLedgerStore,
    failures_left: AtomicU32,
}

impl FlakyStore {
    fn new(failures: u32) -> Self {
        Self {
            inner: MemoryLedgerStore::new(),
            failures_left: AtomicU32::new(failures),
        }
    }
}

#[async_trait]
impl LedgerStore for FlakyStore {
    async fn append(&self, record: &StateRecord) -> Result<(), LedgerError> {
        if self.failures_left.load(Ordering::SeqCst) > 0 {
            self.failures_left.fetch_sub(1, Ordering::SeqCst);
            return Err(LedgerError::StorageUnavailable("simulated".to_string()));
        }
        self.inner.append(record).await
    }

    async fn load(&self, execution_id: &Uuid) -> Result<Vec<StateRecord>, LedgerError> {
        self.inner.load(execution_id).await
    }

    async fn scan(
        &self,
        from: chrono::DateTime<chrono::Utc>,
        to: chrono::DateTime<chrono::Utc>,
    ) -> Result<Vec<StateRecord>, LedgerError> {
        self.inner.scan(from, to).await
    }

    async fn executions(&self) -> Result<Vec<Uuid>, LedgerError> {
        self.inner.executions().await
    }
}

#[tokio::test]
async fn test_transient_storage_failure_retried() {
    let store = Arc::new(FlakyStore::new(2));
    let surface = StateSurface::new(store, LedgerConfig::default());
    let id = Uuid::new_v4();

    // Two transient failures are absorbed by backoff; the caller sees success.
    let record = surface
        .propose(TransitionProposal::genesis(id, "engine"))
        .await
        .unwrap();
    assert_eq!(record.sequence_no, 0);
}

#[tokio::test]
async fn test_storage_failure_surfaces_after_retries_exhaust() {
    let store = Arc::new(FlakyStore::new(10));
    let surface = StateSurface::new(store, LedgerConfig::default());
    let id = Uuid::new_v4();

    let result = surface
        .propose(TransitionProposal::genesis(id, "engine"))
        .await;
    assert!(matches!(result, Err(LedgerError::StorageUnavailable(_))));
}
