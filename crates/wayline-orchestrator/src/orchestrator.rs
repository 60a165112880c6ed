//! Orchestrator trait and run context.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use wayline_ledger::StateSurface;
use wayline_protocols::contract::{IntentGraph, Journey};
use wayline_protocols::signal::CancelSignal;
use wayline_protocols::telemetry::{NoopSink, TelemetrySink};

use crate::capability::{AgentRegistry, ConnectorRegistry};
use crate::config::OrchestratorConfig;
use crate::error::OrchestratorError;

/// Core trait for journey orchestrators.
///
/// The execution engine resolves an orchestrator by the journey's declared
/// type tag and supervises the run; the orchestrator owns the step records
/// between the engine's `Running` and terminal transitions.
#[async_trait]
pub trait Orchestrator: Send + Sync {
    /// The journey type tag this orchestrator handles.
    fn journey_type(&self) -> &str;

    /// Execute the intent graph to completion.
    async fn run(&self, ctx: RunContext) -> Result<(), OrchestratorError>;
}

/// Everything an orchestrator needs for one run.
#[derive(Clone)]
pub struct RunContext {
    /// Execution id.
    pub execution_id: Uuid,

    /// Journey being executed.
    pub journey_id: String,

    /// The intent graph.
    pub graph: IntentGraph,

    /// Input payload of the submission.
    pub input: serde_json::Value,

    /// Outputs of completed intents, keyed by intent id. Refreshed between
    /// scheduling waves.
    pub completed: HashMap<String, serde_json::Value>,

    /// The authoritative ledger.
    pub surface: Arc<StateSurface>,

    /// Registered agents.
    pub agents: Arc<AgentRegistry>,

    /// Registered connectors.
    pub connectors: Arc<ConnectorRegistry>,

    /// Telemetry sink.
    pub telemetry: Arc<dyn TelemetrySink>,

    /// Cooperative cancellation flag, observed at intent boundaries.
    pub cancel: Arc<CancelSignal>,

    /// Timeouts for agent and connector calls.
    pub config: OrchestratorConfig,

    /// Actor name recorded on ledger records written by this run.
    pub actor: String,
}

impl RunContext {
    /// Create a context for a journey run.
    pub fn new(
        execution_id: Uuid,
        journey: &Journey,
        input: serde_json::Value,
        surface: Arc<StateSurface>,
        agents: Arc<AgentRegistry>,
        connectors: Arc<ConnectorRegistry>,
    ) -> Self {
        Self {
            execution_id,
            journey_id: journey.id.clone(),
            graph: journey.intents.clone(),
            input,
            completed: HashMap::new(),
            surface,
            agents,
            connectors,
            telemetry: Arc::new(NoopSink),
            cancel: Arc::new(CancelSignal::new()),
            config: OrchestratorConfig::default(),
            actor: "orchestrator".to_string(),
        }
    }

    /// Attach a telemetry sink.
    pub fn with_telemetry(mut self, sink: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = sink;
        self
    }

    /// Share the execution's cancel signal.
    pub fn with_cancel(mut self, cancel: Arc<CancelSignal>) -> Self {
        self.cancel = cancel;
        self
    }

    /// Override timeouts.
    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }
}
