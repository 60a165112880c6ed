//! Built-in agent and connector registration for the Wayline CLI.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use wayline_engine::ExecutionEngine;
use wayline_protocols::agent::{Agent, ProposalContext, ProposedAction};
use wayline_protocols::connector::{ActionOutcome, ActionRequest, Connector, ConnectorContext};
use wayline_protocols::contract::{Intent, Journey, Solution};
use wayline_protocols::error::{AgentError, ConnectorError};

/// Agent that proposes the action scripted in the intent's params:
/// `connector` and `action` keys, defaulting to log/write.
pub(crate) struct ScriptedAgent;

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

/// Connector that writes messages to the process log.
pub(crate) struct LogConnector;

#[async_trait]
impl Connector for LogConnector {
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
        let message = request
            .params
            .get("message")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();
        info!("[{}] {}", request.intent_id, message);
        Ok(ActionOutcome::success(serde_json::json!({
            "written": message
        })))
    }
}

/// Register the built-in agent and connector.
pub(crate) fn register_builtins(engine: &ExecutionEngine) {
    engine.register_agent(Arc::new(ScriptedAgent));
    engine.register_connector(Arc::new(LogConnector));
}

/// A small demo contract, printed by `wayline sample`.
pub(crate) fn sample_solution() -> Solution {
    Solution::new("demo", "Customer onboarding")
        .with_description("Demo solution exercising the built-in agent and connector")
        .with_journey(
            Journey::new("onboard", "Onboard a customer", "graph")
                .with_intent(
                    Intent::new("fetch-profile", "Fetch the customer profile", "scripted")
                        .with_capability("log", "write")
                        .with_params(serde_json::json!({"message": "fetching profile"})),
                )
                .with_intent(
                    Intent::new("audit", "Record the onboarding", "scripted")
                        .with_capability("log", "write")
                        .with_params(serde_json::json!({"message": "audit entry"})),
                )
                .with_intent(
                    Intent::new("welcome", "Send the welcome message", "scripted")
                        .with_capability("log", "write")
                        .with_dependency("fetch-profile")
                        .with_params(serde_json::json!({"message": "welcome aboard"})),
                )
                .with_intent(
                    Intent::new("welcome-retry", "Retry the welcome message", "scripted")
                        .with_capability("log", "write")
                        .with_fallback_for("welcome")
                        .with_params(serde_json::json!({"message": "welcome aboard (retry)"})),
                ),
        )
}
