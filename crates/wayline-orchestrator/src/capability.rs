//! Registries for pluggable agents and connectors.

use dashmap::DashMap;
use std::sync::Arc;
use tracing::info;

use wayline_protocols::agent::Agent;
use wayline_protocols::connector::Connector;

/// Registry of agents by id.
pub struct AgentRegistry {
    agents: DashMap<String, Arc<dyn Agent>>,
}

impl AgentRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            agents: DashMap::new(),
        }
    }

    /// Register an agent. A later registration replaces an earlier one with
    /// the same id.
    pub fn register(&self, agent: Arc<dyn Agent>) {
        let id = agent.id().to_string();
        info!("Registering agent: {}", id);
        self.agents.insert(id, agent);
    }

    /// Get an agent by id.
    pub fn get(&self, agent_id: &str) -> Option<Arc<dyn Agent>> {
        self.agents.get(agent_id).map(|a| a.clone())
    }

    /// List all registered agent ids.
    pub fn list_ids(&self) -> Vec<String> {
        self.agents.iter().map(|a| a.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Registry of connectors by id.
pub struct ConnectorRegistry {
    connectors: DashMap<String, Arc<dyn Connector>>,
}

impl ConnectorRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            connectors: DashMap::new(),
        }
    }

    /// Register a connector. A later registration replaces an earlier one
    /// with the same id.
    pub fn register(&self, connector: Arc<dyn Connector>) {
        let id = connector.id().to_string();
        info!("Registering connector: {}", id);
        self.connectors.insert(id, connector);
    }

    /// Get a connector by id.
    pub fn get(&self, connector_id: &str) -> Option<Arc<dyn Connector>> {
        self.connectors.get(connector_id).map(|c| c.clone())
    }

    /// List all registered connector ids.
    pub fn list_ids(&self) -> Vec<String> {
        self.connectors.iter().map(|c| c.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.connectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connectors.is_empty()
    }
}

impl Default for ConnectorRegistry {
    fn default() -> Self {
        Self::new()
    }
}
