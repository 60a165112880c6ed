//! Orchestrator resolution by journey type.

use dashmap::DashMap;
use std::sync::Arc;
use tracing::info;

use wayline_orchestrator::{GraphOrchestrator, Orchestrator};

use crate::error::EngineError;

/// Factory producing orchestrator instances for one journey type tag.
pub trait OrchestratorFactory: Send + Sync {
    /// The journey type this factory covers.
    fn journey_type(&self) -> &str;

    /// Build an orchestrator for one run.
    fn build(&self) -> Arc<dyn Orchestrator>;
}

/// Capability registry mapping journey type tags to factories.
pub struct OrchestratorRegistry {
    factories: DashMap<String, Arc<dyn OrchestratorFactory>>,
}

impl OrchestratorRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            factories: DashMap::new(),
        }
    }

    /// Register a factory.
    ///
    /// Returns an error if a factory for the same journey type is already
    /// registered.
    pub fn register(&self, factory: Arc<dyn OrchestratorFactory>) -> Result<(), EngineError> {
        let journey_type = factory.journey_type().to_string();
        if self.factories.contains_key(&journey_type) {
            return Err(EngineError::AlreadyRegistered(journey_type));
        }
        info!("Registering orchestrator for journey type: {}", journey_type);
        self.factories.insert(journey_type, factory);
        Ok(())
    }

    /// Resolve the factory for a journey type.
    pub fn get(&self, journey_type: &str) -> Option<Arc<dyn OrchestratorFactory>> {
        self.factories.get(journey_type).map(|f| f.clone())
    }

    /// List registered journey types.
    pub fn list_types(&self) -> Vec<String> {
        self.factories.iter().map(|f| f.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl Default for OrchestratorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Factory for the default graph orchestrator.
pub struct GraphOrchestratorFactory {
    journey_type: String,
}

impl GraphOrchestratorFactory {
    /// Create a factory for a journey type tag.
    pub fn new(journey_type: impl Into<String>) -> Self {
        Self {
            journey_type: journey_type.into(),
        }
    }
}

impl OrchestratorFactory for GraphOrchestratorFactory {
    fn journey_type(&self) -> &str {
        &self.journey_type
    }

    fn build(&self) -> Arc<dyn Orchestrator> {
        Arc::new(GraphOrchestrator::new(self.journey_type.clone()))
    }
}
