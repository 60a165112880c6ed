//! The state surface: propose/read/subscribe over the ledger store.

use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use tokio::sync::{broadcast, Mutex};
use tokio::time::sleep;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, warn};
use uuid::Uuid;

use wayline_protocols::telemetry::{NoopSink, TelemetryEvent, TelemetrySink};

use crate::config::LedgerConfig;
use crate::error::LedgerError;
use crate::record::{ExecutionState, StateRecord, TransitionProposal};
use crate::replay::ExecutionView;
use crate::store::LedgerStore;

/// Cached head of one execution's chain.
#[derive(Debug, Clone)]
struct Head {
    last_seq: u64,
    state: ExecutionState,
}

/// Authoritative append-only ledger of execution state transitions.
///
/// Writes are totally ordered per execution and partitioned by execution id:
/// a per-execution mutex serializes appends, no cross-execution locking is
/// involved.
pub struct StateSurface {
    store: Arc<dyn LedgerStore>,
    heads: DashMap<Uuid, Head>,
    by_key: DashMap<(Uuid, String), StateRecord>,
    hydrated: DashMap<Uuid, ()>,
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
    channels: DashMap<Uuid, broadcast::Sender<StateRecord>>,
    telemetry: Arc<dyn TelemetrySink>,
    config: LedgerConfig,
}

impl StateSurface {
    /// Create a new surface over a store.
    pub fn new(store: Arc<dyn LedgerStore>, config: LedgerConfig) -> Self {
        Self {
            store,
            heads: DashMap::new(),
            by_key: DashMap::new(),
            hydrated: DashMap::new(),
            locks: DashMap::new(),
            channels: DashMap::new(),
            telemetry: Arc::new(NoopSink),
            config,
        }
    }

    /// Attach a telemetry sink.
    pub fn with_telemetry(mut self, sink: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = sink;
        self
    }

    /// Propose a transition.
    ///
    /// Returns the committed record, or the previously committed record if
    /// the proposal's idempotency key was already committed. Success is
    /// acknowledged only after the store persisted the record.
    pub async fn propose(
        &self,
        proposal: TransitionProposal,
    ) -> Result<StateRecord, LedgerError> {
        let execution_id = proposal.execution_id;
        let lock = self.lock_for(execution_id);
        let _guard = lock.lock().await;
        let started = Instant::now();

        self.hydrate(execution_id).await?;

        let key = (execution_id, proposal.idempotency_key.clone());
        if let Some(existing) = self.by_key.get(&key) {
            debug!(
                "Idempotent propose for execution {} key {}",
                execution_id, proposal.idempotency_key
            );
            return Ok(existing.clone());
        }

        let head = self.heads.get(&execution_id).map(|h| h.clone());

        if let Some(head) = &head {
            if head.state.is_terminal() {
                return Err(LedgerError::TerminalState(execution_id));
            }
        }

        let expected_seq = head.as_ref().map(|h| h.last_seq + 1).unwrap_or(0);
        if proposal.sequence_no != expected_seq {
            return Err(LedgerError::SequenceConflict {
                execution_id,
                detail: format!(
                    "expected sequence {}, got {}",
                    expected_seq, proposal.sequence_no
                ),
            });
        }

        let expected_prior = head.as_ref().map(|h| h.state.clone());
        if proposal.prior_state != expected_prior {
            return Err(LedgerError::SequenceConflict {
                execution_id,
                detail: format!(
                    "prior state {:?} does not match committed state {:?}",
                    proposal.prior_state, expected_prior
                ),
            });
        }

        let record = proposal.into_record();
        self.append_with_retry(&record).await?;

        self.heads.insert(
            execution_id,
            Head {
                last_seq: record.sequence_no,
                state: record.new_state.clone(),
            },
        );
        self.by_key.insert(key, record.clone());

        if let Some(tx) = self.channels.get(&execution_id) {
            // Only fails when no subscriber is listening.
            let _ = tx.send(record.clone());
        }

        self.telemetry
            .report(TelemetryEvent::counter("ledger", "records_committed", 1.0));
        self.telemetry.report(TelemetryEvent::duration_ms(
            "ledger",
            "propose_duration",
            started.elapsed().as_secs_f64() * 1000.0,
        ));

        Ok(record)
    }

    /// Read the ordered record chain of one execution.
    pub async fn read(&self, execution_id: &Uuid) -> Result<Vec<StateRecord>, LedgerError> {
        self.store.load(execution_id).await
    }

    /// Read all records committed in a time range, across executions.
    pub async fn scan(
        &self,
        from: chrono::DateTime<chrono::Utc>,
        to: chrono::DateTime<chrono::Utc>,
    ) -> Result<Vec<StateRecord>, LedgerError> {
        self.store.scan(from, to).await
    }

    /// Replay an execution's chain into its canonical view.
    pub async fn view(&self, execution_id: &Uuid) -> Result<Option<ExecutionView>, LedgerError> {
        let records = self.read(execution_id).await?;
        Ok(ExecutionView::replay(&records))
    }

    /// Subscribe to records committed for an execution from this point on.
    /// History is served by [`StateSurface::read`].
    pub fn subscribe(&self, execution_id: Uuid) -> BroadcastStream<StateRecord> {
        let tx = self
            .channels
            .entry(execution_id)
            .or_insert_with(|| broadcast::channel(self.config.subscribe_capacity).0);
        BroadcastStream::new(tx.subscribe())
    }

    fn lock_for(&self, execution_id: Uuid) -> Arc<Mutex<()>> {
        self.locks
            .entry(execution_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Load committed records into the head and idempotency caches once per
    /// execution. Makes sequence validation and idempotent commit survive a
    /// process restart.
    async fn hydrate(&self, execution_id: Uuid) -> Result<(), LedgerError> {
        if self.hydrated.contains_key(&execution_id) {
            return Ok(());
        }

        let records = self.store.load(&execution_id).await?;
        for record in records {
            self.by_key.insert(
                (execution_id, record.idempotency_key.clone()),
                record.clone(),
            );
            self.heads.insert(
                execution_id,
                Head {
                    last_seq: record.sequence_no,
                    state: record.new_state.clone(),
                },
            );
        }
        self.hydrated.insert(execution_id, ());
        Ok(())
    }

    /// Append with bounded exponential backoff on transient storage errors.
    async fn append_with_retry(&self, record: &StateRecord) -> Result<(), LedgerError> {
        let retry = &self.config.retry;
        let mut attempt = 0;

        loop {
            match self.store.append(record).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    if !e.is_retryable() || attempt >= retry.max_retries {
                        return Err(e);
                    }
                    let delay = retry.delay_for_attempt(attempt);
                    warn!(
                        "Ledger append failed (attempt {}), retrying in {:?}: {}",
                        attempt + 1,
                        delay,
                        e
                    );
                    self.telemetry.report(TelemetryEvent::counter(
                        "ledger",
                        "append_retries",
                        1.0,
                    ));
                    sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "surface_tests.rs"]
mod tests;
