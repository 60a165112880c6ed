use super::*;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use uuid::Uuid;

use wayline_ledger::{
    ExecutionState, LedgerConfig, MemoryLedgerStore, StateSurface, TransitionProposal,
};
use wayline_protocols::agent::{Agent, ProposalContext, ProposedAction};
use wayline_protocols::connector::{ActionOutcome, ActionRequest, Connector, ConnectorContext};
use wayline_protocols::contract::Journey;
use wayline_protocols::error::{AgentError, ConnectorError};

use crate::capability::{AgentRegistry, ConnectorRegistry};
use crate::config::OrchestratorConfig;

/// Agent that proposes whatever the intent's params script: `connector` and
/// `action` keys, defaulting to log/write.
struct ScriptedAgent;

#[async_trait]
impl Agent for ScriptedAgent {
    fn id(&self) -> &str {
        "scripted"
    }

    async fn propose(
        &self,
        intent: &Intent,
        _ctx: ProposalContext,
    ) -> Result<ProposedAction, AgentError> {
        let connector = intent
            .params
            .get("connector")
            .and_then(|v| v.as_str())
            .unwrap_or("log");
        let action = intent
            .params
            .get("action")
            .and_then(|v| v.as_str())
            .unwrap_or("write");
        Ok(ProposedAction::new(connector, action).with_params(intent.params.clone()))
    }
}

/// Connector that records which intents it executed.
struct RecordingConnector {
    calls: Mutex<Vec<String>>,
    delay: Duration,
    fail_intents: Vec<String>,
}

impl RecordingConnector {
    fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
            fail_intents: Vec::new(),
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn failing_on(mut self, intent_id: &str) -> Self {
        self.fail_intents.push(intent_id.to_string());
        self
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Connector for RecordingConnector {
    fn id(&self) -> &str {
        "log"
    }

    fn actions(&self) -> Vec<String> {
        vec!["write".to_string()]
    }

    async fn execute(
        &self,
        request: ActionRequest,
        _ctx: ConnectorContext,
    ) -> Result<ActionOutcome, ConnectorError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.calls.lock().unwrap().push(request.intent_id.clone());

        if self.fail_intents.contains(&request.intent_id) {
            return Ok(ActionOutcome::error("simulated connector failure"));
        }
        Ok(ActionOutcome::success(serde_json::json!({
            "intent": request.intent_id
        })))
    }
}

async fn setup(
    journey: &Journey,
    connector: Arc<RecordingConnector>,
) -> (Arc<StateSurface>, RunContext, Uuid) {
    let surface = Arc::new(StateSurface::new(
        Arc::new(MemoryLedgerStore::new()),
        LedgerConfig::default(),
    ));
    let execution_id = Uuid::new_v4();

    // The engine commits these before any orchestrator runs.
    surface
        .propose(TransitionProposal::genesis(execution_id, "engine"))
        .await
        .unwrap();
    surface
        .propose(TransitionProposal::new(
            execution_id,
            1,
            Some(ExecutionState::Pending),
            ExecutionState::Running,
            "engine",
        ))
        .await
        .unwrap();

    let agents = Arc::new(AgentRegistry::new());
    agents.register(Arc::new(ScriptedAgent));
    let connectors = Arc::new(ConnectorRegistry::new());
    connectors.register(connector);

    let ctx = RunContext::new(
        execution_id,
        journey,
        serde_json::json!({"submitted": true}),
        surface.clone(),
        agents,
        connectors,
    );
    (surface, ctx, execution_id)
}

fn logged_intent(id: &str) -> Intent {
    Intent::new(id, id, "scripted")
        .with_capability("log", "write")
        .with_params(serde_json::json!({"message": id}))
}

#[tokio::test]
async fn test_sequential_journey_ledger_order() {
    let journey = Journey::new("j1", "Sequential", "graph")
        .with_intent(logged_intent("i1"))
        .with_intent(logged_intent("i2").with_dependency("i1"));
    let connector = Arc::new(RecordingConnector::new());
    let (surface, ctx, execution_id) = setup(&journey, connector.clone()).await;

    GraphOrchestrator::new("graph").run(ctx).await.unwrap();

    assert_eq!(connector.calls(), vec!["i1".to_string(), "i2".to_string()]);

    let records = surface.read(&execution_id).await.unwrap();
    let states: Vec<ExecutionState> = records.iter().map(|r| r.new_state.clone()).collect();
    assert_eq!(
        states,
        vec![
            ExecutionState::Pending,
            ExecutionState::Running,
            ExecutionState::StepStarted {
                intent_id: "i1".to_string()
            },
            ExecutionState::StepCompleted {
                intent_id: "i1".to_string()
            },
            ExecutionState::StepStarted {
                intent_id: "i2".to_string()
            },
            ExecutionState::StepCompleted {
                intent_id: "i2".to_string()
            },
        ]
    );
    for (i, record) in records.iter().enumerate() {
        assert_eq!(record.sequence_no, i as u64);
    }
    // Step records carry payload digests.
    assert!(records[2].payload_hash.is_some());
    assert!(records[3].payload_hash.is_some());
}

#[tokio::test]
async fn test_capability_violation_never_reaches_connector() {
    let rogue = Intent::new("i2", "Rogue", "scripted")
        .with_capability("log", "write")
        .with_dependency("i1")
        .with_params(serde_json::json!({"connector": "vault", "action": "unlock"}));
    let journey = Journey::new("j1", "Rogue journey", "graph")
        .with_intent(logged_intent("i1"))
        .with_intent(rogue);
    let connector = Arc::new(RecordingConnector::new());
    let (surface, ctx, execution_id) = setup(&journey, connector.clone()).await;

    let result = GraphOrchestrator::new("graph").run(ctx).await;
    assert!(matches!(
        result,
        Err(OrchestratorError::CapabilityViolation { .. })
    ));

    // The connector only ever saw the first intent.
    assert_eq!(connector.calls(), vec!["i1".to_string()]);

    // No pre record was written for the rogue intent.
    let records = surface.read(&execution_id).await.unwrap();
    assert!(!records.iter().any(|r| matches!(
        &r.new_state,
        ExecutionState::StepStarted { intent_id } if intent_id == "i2"
    )));
}

#[tokio::test]
async fn test_independent_intents_run_concurrently() {
    let journey = Journey::new("j1", "Parallel", "graph")
        .with_intent(logged_intent("a"))
        .with_intent(logged_intent("b"));
    let connector = Arc::new(RecordingConnector::new().with_delay(Duration::from_millis(100)));
    let (_surface, ctx, _execution_id) = setup(&journey, connector.clone()).await;

    let started = Instant::now();
    GraphOrchestrator::new("graph").run(ctx).await.unwrap();
    let elapsed = started.elapsed();

    // Both 100ms actions overlapped: well under the 200ms serial total.
    assert!(elapsed < Duration::from_millis(190), "took {:?}", elapsed);
    assert_eq!(connector.calls().len(), 2);
}

#[tokio::test]
async fn test_dependent_intent_waits_for_barrier() {
    let journey = Journey::new("j1", "Join", "graph")
        .with_intent(logged_intent("a"))
        .with_intent(logged_intent("b"))
        .with_intent(
            logged_intent("c")
                .with_dependency("a")
                .with_dependency("b"),
        );
    let connector = Arc::new(RecordingConnector::new().with_delay(Duration::from_millis(10)));
    let (_surface, ctx, _execution_id) = setup(&journey, connector.clone()).await;

    GraphOrchestrator::new("graph").run(ctx).await.unwrap();

    let calls = connector.calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[2], "c");
}

#[tokio::test]
async fn test_declared_fallback_runs() {
    let journey = Journey::new("j1", "Fallback", "graph")
        .with_intent(logged_intent("i1"))
        .with_intent(logged_intent("i1-retry").with_fallback_for("i1"))
        .with_intent(logged_intent("i2").with_dependency("i1"));
    let connector = Arc::new(RecordingConnector::new().failing_on("i1"));
    let (surface, ctx, execution_id) = setup(&journey, connector.clone()).await;

    GraphOrchestrator::new("graph").run(ctx).await.unwrap();

    let calls = connector.calls();
    assert_eq!(calls, vec!["i1", "i1-retry", "i2"]);

    let records = surface.read(&execution_id).await.unwrap();
    assert!(records.iter().any(|r| matches!(
        &r.new_state,
        ExecutionState::StepCompleted { intent_id } if intent_id == "i1-retry"
    )));
}

#[tokio::test]
async fn test_unhandled_failure_without_fallback_fails_run() {
    let journey = Journey::new("j1", "No fallback", "graph")
        .with_intent(logged_intent("i1"))
        .with_intent(logged_intent("i2").with_dependency("i1"));
    let connector = Arc::new(RecordingConnector::new().failing_on("i1"));
    let (_surface, ctx, _execution_id) = setup(&journey, connector.clone()).await;

    let result = GraphOrchestrator::new("graph").run(ctx).await;
    assert!(matches!(result, Err(OrchestratorError::Connector(_))));

    // The dependent intent never ran.
    assert_eq!(connector.calls(), vec!["i1"]);
}

#[tokio::test]
async fn test_resume_skips_committed_steps() {
    let journey = Journey::new("j1", "Resume", "graph")
        .with_intent(logged_intent("i1"))
        .with_intent(logged_intent("i2").with_dependency("i1"));
    let connector = Arc::new(RecordingConnector::new());
    let (surface, ctx, execution_id) = setup(&journey, connector.clone()).await;

    // Simulated prior run: i1's pre and post records are already committed.
    surface
        .propose(
            TransitionProposal::new(
                execution_id,
                2,
                Some(ExecutionState::Running),
                ExecutionState::StepStarted {
                    intent_id: "i1".to_string(),
                },
                "orchestrator",
            )
            .with_idempotency_key(format!("{}:i1:pre", execution_id)),
        )
        .await
        .unwrap();
    surface
        .propose(
            TransitionProposal::new(
                execution_id,
                3,
                Some(ExecutionState::StepStarted {
                    intent_id: "i1".to_string(),
                }),
                ExecutionState::StepCompleted {
                    intent_id: "i1".to_string(),
                },
                "orchestrator",
            )
            .with_idempotency_key(format!("{}:i1:post", execution_id)),
        )
        .await
        .unwrap();

    GraphOrchestrator::new("graph").run(ctx).await.unwrap();

    // Only the unfinished intent ran.
    assert_eq!(connector.calls(), vec!["i2"]);
}

#[tokio::test]
async fn test_cancel_observed_at_intent_boundary() {
    let journey = Journey::new("j1", "Cancelled", "graph").with_intent(logged_intent("i1"));
    let connector = Arc::new(RecordingConnector::new());
    let (_surface, ctx, _execution_id) = setup(&journey, connector.clone()).await;

    ctx.cancel.cancel();
    let result = GraphOrchestrator::new("graph").run(ctx).await;
    assert!(matches!(result, Err(OrchestratorError::Cancelled)));
    assert!(connector.calls().is_empty());
}

#[tokio::test]
async fn test_connector_timeout_fails_step() {
    let journey = Journey::new("j1", "Slow", "graph").with_intent(logged_intent("i1"));
    let connector = Arc::new(RecordingConnector::new().with_delay(Duration::from_secs(5)));
    let (_surface, ctx, _execution_id) = setup(&journey, connector.clone()).await;
    let ctx = ctx.with_config(OrchestratorConfig {
        connector_timeout_secs: 1,
        ..Default::default()
    });

    let result = GraphOrchestrator::new("graph").run(ctx).await;
    assert!(matches!(
        result,
        Err(OrchestratorError::StepTimeout { .. })
    ));
}

#[tokio::test]
async fn test_unknown_agent_fails_run() {
    let journey = Journey::new("j1", "No agent", "graph")
        .with_intent(Intent::new("i1", "Orphan", "missing").with_capability("log", "write"));
    let connector = Arc::new(RecordingConnector::new());
    let (_surface, ctx, _execution_id) = setup(&journey, connector.clone()).await;

    let result = GraphOrchestrator::new("graph").run(ctx).await;
    assert!(matches!(result, Err(OrchestratorError::Agent(_))));
}
