//! The execution engine: submit, supervise, query, cancel.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tracing::{error, info, warn};
use uuid::Uuid;

use wayline_ledger::{
    ExecutionState, ExecutionView, LedgerError, StateSurface, TransitionProposal,
};
use wayline_orchestrator::{AgentRegistry, ConnectorRegistry, OrchestratorError, RunContext};
use wayline_protocols::agent::Agent;
use wayline_protocols::connector::Connector;
use wayline_protocols::contract::{Journey, Solution};
use wayline_protocols::signal::CancelSignal;
use wayline_protocols::telemetry::{NoopSink, TelemetryEvent, TelemetrySink};
use wayline_protocols::types::{ExecutionStatus, ReasonCode};

use crate::catalog::ContractCatalog;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::registry::{OrchestratorFactory, OrchestratorRegistry};

/// Status view returned by queries, derived by replaying the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionStatusView {
    /// Execution id.
    pub execution_id: Uuid,

    /// Coarse status.
    pub status: ExecutionStatus,

    /// Machine-readable reason for non-success terminal statuses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<ReasonCode>,

    /// Number of committed ledger records.
    pub record_count: usize,
}

/// Acknowledgement of a cancel request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelAck {
    /// The cancel flag was set; the execution terminates cooperatively.
    Accepted,
    /// The execution already reached a terminal state.
    AlreadyTerminal,
}

/// Handle for one running execution.
struct ExecutionHandle {
    cancel: Arc<CancelSignal>,
}

/// Top-level dispatcher for journey executions.
///
/// Submissions are recorded in the ledger before any orchestrator runs
/// (durability-first dispatch), supervised against a per-execution deadline,
/// and finalized with a terminal transition carrying a machine-readable
/// reason.
#[derive(Clone)]
pub struct ExecutionEngine {
    config: EngineConfig,
    catalog: Arc<ContractCatalog>,
    orchestrators: Arc<OrchestratorRegistry>,
    agents: Arc<AgentRegistry>,
    connectors: Arc<ConnectorRegistry>,
    surface: Arc<StateSurface>,
    telemetry: Arc<dyn TelemetrySink>,
    running: Arc<DashMap<Uuid, ExecutionHandle>>,
    semaphore: Arc<Semaphore>,
}

impl ExecutionEngine {
    /// Create a new engine over a state surface.
    pub fn new(surface: Arc<StateSurface>, config: EngineConfig) -> Self {
        let permits = config.max_concurrent;
        Self {
            config,
            catalog: Arc::new(ContractCatalog::new()),
            orchestrators: Arc::new(OrchestratorRegistry::new()),
            agents: Arc::new(AgentRegistry::new()),
            connectors: Arc::new(ConnectorRegistry::new()),
            surface,
            telemetry: Arc::new(NoopSink),
            running: Arc::new(DashMap::new()),
            semaphore: Arc::new(Semaphore::new(permits)),
        }
    }

    /// Attach a telemetry sink.
    pub fn with_telemetry(mut self, sink: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = sink;
        self
    }

    /// Register a published solution.
    pub fn register_solution(&self, solution: Solution) -> Result<(), EngineError> {
        self.catalog.register(solution)
    }

    /// Register an orchestrator factory.
    pub fn register_orchestrator(
        &self,
        factory: Arc<dyn OrchestratorFactory>,
    ) -> Result<(), EngineError> {
        self.orchestrators.register(factory)
    }

    /// Register an agent.
    pub fn register_agent(&self, agent: Arc<dyn Agent>) {
        self.agents.register(agent);
    }

    /// Register a connector.
    pub fn register_connector(&self, connector: Arc<dyn Connector>) {
        self.connectors.register(connector);
    }

    /// The state surface backing this engine.
    pub fn surface(&self) -> &Arc<StateSurface> {
        &self.surface
    }

    /// Number of currently running executions.
    pub fn running_count(&self) -> usize {
        self.running.len()
    }

    /// Whether an execution is currently supervised by this engine.
    pub fn is_running(&self, execution_id: &Uuid) -> bool {
        self.running.contains_key(execution_id)
    }

    /// Submit a journey for execution.
    ///
    /// Resolves the contract and the orchestrator first, commits the PENDING
    /// genesis record, then dispatches without blocking the caller.
    pub async fn submit(
        &self,
        solution_id: &str,
        journey_id: &str,
        input: serde_json::Value,
    ) -> Result<Uuid, EngineError> {
        let (_, journey) = self.catalog.resolve(solution_id, journey_id)?;
        let factory = self
            .orchestrators
            .get(&journey.journey_type)
            .ok_or_else(|| {
                EngineError::ContractResolution(format!(
                    "no orchestrator registered for journey type: {}",
                    journey.journey_type
                ))
            })?;

        let execution_id = Uuid::new_v4();

        // Durability-first: no execution ever runs without a ledger entry.
        self.surface
            .propose(TransitionProposal::genesis(execution_id, "engine"))
            .await?;

        info!(
            "Submitted journey {}/{} as execution {}",
            solution_id, journey_id, execution_id
        );
        self.telemetry
            .report(TelemetryEvent::counter("engine", "executions_submitted", 1.0));

        self.dispatch(execution_id, journey, factory, input);
        Ok(execution_id)
    }

    /// Resume an execution that already has committed records, e.g. after a
    /// process restart. The orchestrator replays the ledger and continues
    /// from the last committed step.
    pub async fn resume(
        &self,
        execution_id: Uuid,
        solution_id: &str,
        journey_id: &str,
        input: serde_json::Value,
    ) -> Result<(), EngineError> {
        let records = self.surface.read(&execution_id).await?;
        let view = ExecutionView::replay(&records)
            .ok_or(EngineError::ExecutionNotFound(execution_id))?;
        if view.is_terminal() {
            return Ok(());
        }
        if self.is_running(&execution_id) {
            return Ok(());
        }

        let (_, journey) = self.catalog.resolve(solution_id, journey_id)?;
        let factory = self
            .orchestrators
            .get(&journey.journey_type)
            .ok_or_else(|| {
                EngineError::ContractResolution(format!(
                    "no orchestrator registered for journey type: {}",
                    journey.journey_type
                ))
            })?;

        info!("Resuming execution {}", execution_id);
        self.dispatch(execution_id, journey, factory, input);
        Ok(())
    }

    /// Current status of an execution.
    pub async fn status(&self, execution_id: &Uuid) -> Result<ExecutionStatusView, EngineError> {
        let records = self.surface.read(execution_id).await?;
        let view = ExecutionView::replay(&records)
            .ok_or(EngineError::ExecutionNotFound(*execution_id))?;
        Ok(ExecutionStatusView {
            execution_id: *execution_id,
            status: view.status,
            reason: view.reason,
            record_count: view.record_count,
        })
    }

    /// Request cancellation.
    ///
    /// Cooperative: the flag is observed at the next intent boundary and the
    /// execution terminates asynchronously, bounded by the deadline.
    pub async fn cancel(&self, execution_id: &Uuid) -> Result<CancelAck, EngineError> {
        let records = self.surface.read(execution_id).await?;
        let view = ExecutionView::replay(&records)
            .ok_or(EngineError::ExecutionNotFound(*execution_id))?;
        if view.is_terminal() {
            return Ok(CancelAck::AlreadyTerminal);
        }

        let live = self.running.get(execution_id).map(|h| h.cancel.clone());
        match live {
            Some(cancel) => {
                cancel.cancel();
                info!("Cancellation requested for execution {}", execution_id);
            }
            None => {
                // No live supervisor holds this execution; finalize directly.
                self.finalize(*execution_id, ExecutionState::Cancelled).await;
            }
        }
        self.telemetry
            .report(TelemetryEvent::counter("engine", "cancellations", 1.0));
        Ok(CancelAck::Accepted)
    }

    /// Spawn the supervised run. Never blocks the caller.
    fn dispatch(
        &self,
        execution_id: Uuid,
        journey: Journey,
        factory: Arc<dyn OrchestratorFactory>,
        input: serde_json::Value,
    ) {
        let cancel = Arc::new(CancelSignal::new());
        self.running.insert(
            execution_id,
            ExecutionHandle {
                cancel: cancel.clone(),
            },
        );

        let engine = self.clone();
        tokio::spawn(async move {
            engine
                .supervise(execution_id, journey, factory, input, cancel)
                .await;
        });
    }

    /// Supervisor: runs the orchestrator under the deadline and writes the
    /// terminal transition whatever happens.
    async fn supervise(
        self,
        execution_id: Uuid,
        journey: Journey,
        factory: Arc<dyn OrchestratorFactory>,
        input: serde_json::Value,
        cancel: Arc<CancelSignal>,
    ) {
        let started = Instant::now();

        let _permit = match self.semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => {
                self.running.remove(&execution_id);
                return;
            }
        };

        let terminal = self
            .run_supervised(execution_id, journey, factory, input, cancel.clone())
            .await;

        let outcome = match &terminal {
            ExecutionState::Succeeded => "succeeded",
            ExecutionState::Cancelled => "cancelled",
            _ => "failed",
        };
        self.finalize(execution_id, terminal).await;
        self.running.remove(&execution_id);

        self.telemetry.report(
            TelemetryEvent::counter("engine", "executions_completed", 1.0)
                .with_tag("outcome", outcome),
        );
        self.telemetry.report(
            TelemetryEvent::duration_ms(
                "engine",
                "execution_duration",
                started.elapsed().as_secs_f64() * 1000.0,
            )
            .with_execution(execution_id),
        );
    }

    /// Run one orchestrator attempt and map it to a terminal state.
    async fn run_supervised(
        &self,
        execution_id: Uuid,
        journey: Journey,
        factory: Arc<dyn OrchestratorFactory>,
        input: serde_json::Value,
        cancel: Arc<CancelSignal>,
    ) -> ExecutionState {
        // The stable idempotency key makes this a no-op when resuming an
        // execution that already passed PENDING.
        let running = TransitionProposal::new(
            execution_id,
            1,
            Some(ExecutionState::Pending),
            ExecutionState::Running,
            "engine",
        )
        .with_idempotency_key(format!("{}:running", execution_id));
        if let Err(e) = self.surface.propose(running).await {
            error!(
                "Failed to mark execution {} running: {}",
                execution_id, e
            );
            return ExecutionState::Failed {
                reason: reason_for_ledger(&e),
            };
        }

        if cancel.is_cancelled() {
            return ExecutionState::Cancelled;
        }

        let orchestrator = factory.build();
        let ctx = RunContext::new(
            execution_id,
            &journey,
            input,
            self.surface.clone(),
            self.agents.clone(),
            self.connectors.clone(),
        )
        .with_telemetry(self.telemetry.clone())
        .with_cancel(cancel.clone())
        .with_config(self.config.orchestrator.clone());

        let deadline = Duration::from_secs(self.config.deadline_secs);
        match timeout(deadline, orchestrator.run(ctx)).await {
            Ok(Ok(())) => {
                if cancel.is_cancelled() {
                    ExecutionState::Cancelled
                } else {
                    ExecutionState::Succeeded
                }
            }
            Ok(Err(OrchestratorError::Cancelled)) => ExecutionState::Cancelled,
            Ok(Err(e)) => {
                warn!("Execution {} failed: {}", execution_id, e);
                ExecutionState::Failed { reason: e.reason() }
            }
            Err(_) => {
                warn!(
                    "Execution {} exceeded its {}s deadline",
                    execution_id, self.config.deadline_secs
                );
                ExecutionState::Failed {
                    reason: ReasonCode::OrchestratorTimeout,
                }
            }
        }
    }

    /// Commit the terminal transition, tolerating races with concurrent
    /// writers: a lost race against another terminal commit is accepted as
    /// final.
    async fn finalize(&self, execution_id: Uuid, terminal: ExecutionState) {
        for _ in 0..5 {
            let records = match self.surface.read(&execution_id).await {
                Ok(records) => records,
                Err(e) => {
                    error!("Failed to read execution {} for finalize: {}", execution_id, e);
                    return;
                }
            };
            let Some(last) = records.last() else {
                error!("No records found for execution {} during finalize", execution_id);
                return;
            };
            if last.new_state.is_terminal() {
                return;
            }

            let proposal = TransitionProposal::new(
                execution_id,
                last.sequence_no + 1,
                Some(last.new_state.clone()),
                terminal.clone(),
                "engine",
            )
            .with_idempotency_key(format!("{}:terminal", execution_id));

            match self.surface.propose(proposal).await {
                Ok(record) => {
                    info!(
                        "Execution {} finalized as {:?}",
                        execution_id, record.new_state
                    );
                    return;
                }
                Err(LedgerError::SequenceConflict { .. }) => {
                    // Another writer advanced the chain; re-read and retry.
                    continue;
                }
                Err(LedgerError::TerminalState(_)) => return,
                Err(e) => {
                    error!("Failed to finalize execution {}: {}", execution_id, e);
                    return;
                }
            }
        }
        error!(
            "Gave up finalizing execution {} after repeated conflicts",
            execution_id
        );
    }
}

fn reason_for_ledger(error: &LedgerError) -> ReasonCode {
    match error {
        LedgerError::StorageUnavailable(_) | LedgerError::Io(_) => ReasonCode::StorageUnavailable,
        _ => ReasonCode::SequenceConflict,
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
