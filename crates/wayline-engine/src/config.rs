//! Engine configuration.

use wayline_orchestrator::OrchestratorConfig;

/// Configuration for the execution engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Per-execution wall-clock deadline, in seconds. On expiry the
    /// execution fails with an orchestrator-timeout reason regardless of
    /// orchestrator cooperation.
    pub deadline_secs: u64,

    /// Maximum concurrently running executions.
    pub max_concurrent: usize,

    /// Timeouts handed to orchestrator runs.
    pub orchestrator: OrchestratorConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            deadline_secs: 300,
            max_concurrent: 32,
            orchestrator: OrchestratorConfig::default(),
        }
    }
}
