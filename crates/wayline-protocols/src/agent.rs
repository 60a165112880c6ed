//! Agent protocol definitions.
//!
//! Agents are pluggable reasoning components: given an intent, they propose
//! the concrete action to execute. The reasoning implementation (e.g. a model
//! call) is outside this core.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::contract::Intent;
use crate::error::AgentError;
use crate::signal::CancelSignal;
use crate::types::Metadata;

/// Core trait for agents.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Returns the agent id.
    fn id(&self) -> &str;

    /// Propose the action to execute for an intent.
    async fn propose(
        &self,
        intent: &Intent,
        ctx: ProposalContext,
    ) -> Result<ProposedAction, AgentError>;
}

/// Context handed to an agent when asking for a proposal.
#[derive(Clone)]
pub struct ProposalContext {
    /// Execution this proposal belongs to.
    pub execution_id: Uuid,

    /// Journey being executed.
    pub journey_id: String,

    /// Input payload the execution was submitted with.
    pub input: serde_json::Value,

    /// Outputs of intents completed so far, keyed by intent id.
    pub completed: HashMap<String, serde_json::Value>,

    /// Cooperative cancellation flag.
    pub cancel: Arc<CancelSignal>,

    /// Additional context data.
    pub data: Metadata,
}

impl ProposalContext {
    /// Create a new proposal context.
    pub fn new(execution_id: Uuid, journey_id: impl Into<String>, input: serde_json::Value) -> Self {
        Self {
            execution_id,
            journey_id: journey_id.into(),
            input,
            completed: HashMap::new(),
            cancel: Arc::new(CancelSignal::new()),
            data: HashMap::new(),
        }
    }

    /// Check if the execution was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// An action proposed by an agent for one intent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposedAction {
    /// Connector to execute against.
    pub connector_id: String,

    /// Action name on that connector.
    pub action: String,

    /// Action parameters.
    #[serde(default)]
    pub params: serde_json::Value,
}

impl ProposedAction {
    /// Create a new proposed action.
    pub fn new(connector_id: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            connector_id: connector_id.into(),
            action: action.into(),
            params: serde_json::Value::Null,
        }
    }

    /// Set the action parameters.
    pub fn with_params(mut self, params: serde_json::Value) -> Self {
        self.params = params;
        self
    }
}
