//! Contract model: Solution -> Journey -> Intent.
//!
//! A Solution names a business goal and owns a set of Journeys; a Journey
//! owns a directed graph of Intents. Contracts are versioned and become
//! immutable once published.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::error::ContractError;
use crate::types::Metadata;

/// One permissible (connector, action) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Capability {
    /// Connector the action belongs to.
    pub connector_id: String,
    /// Action name on that connector.
    pub action: String,
}

impl Capability {
    pub fn new(connector_id: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            connector_id: connector_id.into(),
            action: action.into(),
        }
    }
}

/// The set of actions an intent is contractually allowed to perform.
///
/// A proposal outside this set never reaches a connector.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CapabilitySet {
    #[serde(default)]
    pub capabilities: Vec<Capability>,
}

impl CapabilitySet {
    /// Create an empty capability set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a permitted (connector, action) pair.
    pub fn allow(mut self, connector_id: impl Into<String>, action: impl Into<String>) -> Self {
        self.capabilities.push(Capability::new(connector_id, action));
        self
    }

    /// Check whether a (connector, action) pair is within the contract.
    pub fn allows(&self, connector_id: &str, action: &str) -> bool {
        self.capabilities
            .iter()
            .any(|c| c.connector_id == connector_id && c.action == action)
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }
}

/// A unit of work inside a Journey.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Intent {
    /// Unique id within the journey.
    pub id: String,

    /// Human-readable name.
    pub name: String,

    /// Agent consulted for the action proposal.
    pub agent_id: String,

    /// Declared capability set for this intent.
    #[serde(default)]
    pub capabilities: CapabilitySet,

    /// Intents that must complete before this one starts.
    #[serde(default)]
    pub depends_on: Vec<String>,

    /// If set, this intent runs only as the declared fallback for the
    /// referenced intent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_for: Option<String>,

    /// Static parameters handed to the agent.
    #[serde(default)]
    pub params: serde_json::Value,

    /// Additional metadata.
    #[serde(default)]
    pub metadata: Metadata,
}

impl Intent {
    /// Create a new intent.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        agent_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            agent_id: agent_id.into(),
            capabilities: CapabilitySet::new(),
            depends_on: Vec::new(),
            fallback_for: None,
            params: serde_json::Value::Null,
            metadata: HashMap::new(),
        }
    }

    /// Allow a (connector, action) pair.
    pub fn with_capability(
        mut self,
        connector_id: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        self.capabilities = self.capabilities.allow(connector_id, action);
        self
    }

    /// Declare a data dependency on another intent.
    pub fn with_dependency(mut self, intent_id: impl Into<String>) -> Self {
        self.depends_on.push(intent_id.into());
        self
    }

    /// Declare this intent as the fallback for another intent.
    pub fn with_fallback_for(mut self, intent_id: impl Into<String>) -> Self {
        self.fallback_for = Some(intent_id.into());
        self
    }

    /// Set static parameters.
    pub fn with_params(mut self, params: serde_json::Value) -> Self {
        self.params = params;
        self
    }

    /// Whether this intent only runs as a fallback.
    pub fn is_fallback(&self) -> bool {
        self.fallback_for.is_some()
    }
}

/// Directed acyclic graph of intents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntentGraph {
    #[serde(default)]
    pub intents: Vec<Intent>,
}

impl IntentGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an intent.
    pub fn with_intent(mut self, intent: Intent) -> Self {
        self.intents.push(intent);
        self
    }

    /// Get an intent by id.
    pub fn get(&self, intent_id: &str) -> Option<&Intent> {
        self.intents.iter().find(|i| i.id == intent_id)
    }

    /// The declared fallback for an intent, if any.
    pub fn fallback_of(&self, intent_id: &str) -> Option<&Intent> {
        self.intents
            .iter()
            .find(|i| i.fallback_for.as_deref() == Some(intent_id))
    }

    /// Ids of all intents that must complete for the journey to succeed.
    ///
    /// Fallback intents are excluded: they only run in place of the intent
    /// they cover.
    pub fn required_ids(&self) -> Vec<&str> {
        self.intents
            .iter()
            .filter(|i| !i.is_fallback())
            .map(|i| i.id.as_str())
            .collect()
    }

    /// Intents whose dependencies are all satisfied and which have not yet
    /// completed. Fallback intents never become ready on their own.
    pub fn ready_after<'a>(&'a self, completed: &HashSet<String>) -> Vec<&'a Intent> {
        self.intents
            .iter()
            .filter(|i| !i.is_fallback())
            .filter(|i| !completed.contains(&i.id))
            .filter(|i| i.depends_on.iter().all(|d| completed.contains(d)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.intents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intents.is_empty()
    }

    /// Validate id uniqueness, dependency references, fallback references and
    /// acyclicity.
    pub fn validate(&self) -> Result<(), ContractError> {
        let mut ids = HashSet::new();
        for intent in &self.intents {
            if !ids.insert(intent.id.as_str()) {
                return Err(ContractError::DuplicateIntent(intent.id.clone()));
            }
        }

        let fallback_ids: HashSet<&str> = self
            .intents
            .iter()
            .filter(|i| i.is_fallback())
            .map(|i| i.id.as_str())
            .collect();

        for intent in &self.intents {
            for dep in &intent.depends_on {
                if !ids.contains(dep.as_str()) {
                    return Err(ContractError::UnknownDependency {
                        intent_id: intent.id.clone(),
                        dependency: dep.clone(),
                    });
                }
                // A fallback only runs in place of a failed intent; nothing
                // may schedule against it directly.
                if fallback_ids.contains(dep.as_str()) {
                    return Err(ContractError::FallbackDependency {
                        intent_id: intent.id.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
            if let Some(target) = &intent.fallback_for {
                if !ids.contains(target.as_str()) {
                    return Err(ContractError::UnknownFallback {
                        intent_id: intent.id.clone(),
                        target: target.clone(),
                    });
                }
            }
        }

        self.check_acyclic()
    }

    /// Kahn's algorithm over the dependency edges.
    fn check_acyclic(&self) -> Result<(), ContractError> {
        let mut in_degree: HashMap<&str, usize> = HashMap::new();
        let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();

        for intent in &self.intents {
            in_degree.entry(intent.id.as_str()).or_insert(0);
            for dep in &intent.depends_on {
                *in_degree.entry(intent.id.as_str()).or_insert(0) += 1;
                dependents
                    .entry(dep.as_str())
                    .or_default()
                    .push(intent.id.as_str());
            }
        }

        let mut queue: Vec<&str> = in_degree
            .iter()
            .filter(|(_, d)| **d == 0)
            .map(|(id, _)| *id)
            .collect();
        let mut visited = 0usize;

        while let Some(id) = queue.pop() {
            visited += 1;
            if let Some(next) = dependents.get(id) {
                for dep_id in next {
                    if let Some(entry) = in_degree.get_mut(dep_id) {
                        *entry -= 1;
                        if *entry == 0 {
                            queue.push(dep_id);
                        }
                    }
                }
            }
        }

        if visited != self.intents.len() {
            let remaining: Vec<&str> = in_degree
                .iter()
                .filter(|(_, d)| **d > 0)
                .map(|(id, _)| *id)
                .collect();
            return Err(ContractError::DependencyCycle(remaining.join(", ")));
        }
        Ok(())
    }
}

/// A workflow: a named intent graph bound to an orchestrator type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Journey {
    /// Unique id within the solution.
    pub id: String,

    /// Human-readable name.
    pub name: String,

    /// Orchestrator type tag resolved by the execution engine.
    pub journey_type: String,

    /// The intent graph.
    #[serde(default)]
    pub intents: IntentGraph,
}

impl Journey {
    /// Create a new journey.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        journey_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            journey_type: journey_type.into(),
            intents: IntentGraph::new(),
        }
    }

    /// Add an intent to the graph.
    pub fn with_intent(mut self, intent: Intent) -> Self {
        self.intents = self.intents.with_intent(intent);
        self
    }
}

/// A versioned business goal owning a set of journeys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Solution {
    /// Unique solution id.
    pub id: String,

    /// Human-readable name.
    pub name: String,

    /// Contract version, bumped on republish.
    #[serde(default = "default_version")]
    pub version: u32,

    /// Description of the business goal.
    #[serde(default)]
    pub description: String,

    /// Journeys owned by this solution.
    #[serde(default)]
    pub journeys: Vec<Journey>,

    /// Once published, the contract is immutable.
    #[serde(default)]
    pub published: bool,
}

fn default_version() -> u32 {
    1
}

impl Solution {
    /// Create a new unpublished solution.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            version: default_version(),
            description: String::new(),
            journeys: Vec::new(),
            published: false,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Add a journey before publication.
    pub fn with_journey(mut self, journey: Journey) -> Self {
        self.journeys.push(journey);
        self
    }

    /// Add a journey to an existing solution. Rejected once published.
    pub fn add_journey(&mut self, journey: Journey) -> Result<(), ContractError> {
        if self.published {
            return Err(ContractError::Published(self.id.clone()));
        }
        self.journeys.push(journey);
        Ok(())
    }

    /// Get a journey by id.
    pub fn journey(&self, journey_id: &str) -> Option<&Journey> {
        self.journeys.iter().find(|j| j.id == journey_id)
    }

    /// Validate every journey's graph and freeze the contract.
    pub fn publish(mut self) -> Result<Self, ContractError> {
        for journey in &self.journeys {
            journey.intents.validate()?;
        }
        self.published = true;
        Ok(self)
    }
}
