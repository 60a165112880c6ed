//! Connector protocol definitions.
//!
//! Connectors execute side-effecting actions against external systems.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ConnectorError;
use crate::signal::CancelSignal;
use crate::types::Metadata;

/// Core trait for connectors.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Returns the connector id.
    fn id(&self) -> &str;

    /// Action names this connector supports.
    fn actions(&self) -> Vec<String>;

    /// Execute an action.
    async fn execute(
        &self,
        request: ActionRequest,
        ctx: ConnectorContext,
    ) -> Result<ActionOutcome, ConnectorError>;

    /// Check whether an action is supported.
    fn supports(&self, action: &str) -> bool {
        self.actions().iter().any(|a| a == action)
    }
}

/// A request to execute one action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRequest {
    /// Execution the action belongs to.
    pub execution_id: Uuid,

    /// Intent the action was proposed for.
    pub intent_id: String,

    /// Action name.
    pub action: String,

    /// Action parameters.
    #[serde(default)]
    pub params: serde_json::Value,
}

impl ActionRequest {
    /// Create a new action request.
    pub fn new(
        execution_id: Uuid,
        intent_id: impl Into<String>,
        action: impl Into<String>,
        params: serde_json::Value,
    ) -> Self {
        Self {
            execution_id,
            intent_id: intent_id.into(),
            action: action.into(),
            params,
        }
    }
}

/// Context for connector execution.
#[derive(Clone)]
pub struct ConnectorContext {
    /// Correlation id for tracing.
    pub correlation_id: String,

    /// Cooperative cancellation flag. In-flight actions are not forcibly
    /// aborted; connectors may observe this for a best-effort stop.
    pub cancel: Arc<CancelSignal>,

    /// Additional context data.
    pub data: Metadata,
}

impl ConnectorContext {
    /// Create a new connector context.
    pub fn new() -> Self {
        Self {
            correlation_id: Uuid::new_v4().to_string(),
            cancel: Arc::new(CancelSignal::new()),
            data: HashMap::new(),
        }
    }

    /// Create a context sharing an execution's cancel signal.
    pub fn with_cancel(cancel: Arc<CancelSignal>) -> Self {
        Self {
            correlation_id: Uuid::new_v4().to_string(),
            cancel,
            data: HashMap::new(),
        }
    }
}

impl Default for ConnectorContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of a connector action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionOutcome {
    /// Whether the action succeeded.
    pub success: bool,

    /// Structured output of the action.
    #[serde(default)]
    pub output: serde_json::Value,

    /// Error message if the action failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Additional metadata about the execution.
    #[serde(default)]
    pub metadata: Metadata,
}

impl ActionOutcome {
    /// Create a successful outcome.
    pub fn success(output: serde_json::Value) -> Self {
        Self {
            success: true,
            output,
            error: None,
            metadata: HashMap::new(),
        }
    }

    /// Create a failed outcome.
    pub fn error(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: serde_json::Value::Null,
            error: Some(error.into()),
            metadata: HashMap::new(),
        }
    }

    /// Add metadata to the outcome.
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}
