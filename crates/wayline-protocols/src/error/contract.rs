//! Contract model errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContractError {
    #[error("Solution {0} is published and immutable")]
    Published(String),

    #[error("Duplicate intent id: {0}")]
    DuplicateIntent(String),

    #[error("Intent {intent_id} depends on unknown intent: {dependency}")]
    UnknownDependency {
        intent_id: String,
        dependency: String,
    },

    #[error("Intent {intent_id} declares fallback for unknown intent: {target}")]
    UnknownFallback { intent_id: String, target: String },

    #[error("Intent {intent_id} depends on fallback intent: {dependency}")]
    FallbackDependency {
        intent_id: String,
        dependency: String,
    },

    #[error("Intent graph contains a dependency cycle involving: {0}")]
    DependencyCycle(String),

    #[error("Journey not found: {0}")]
    UnknownJourney(String),
}
