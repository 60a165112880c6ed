//! Orchestrator configuration.

/// Configuration for a journey run.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Timeout for one agent proposal, in seconds.
    pub agent_timeout_secs: u64,

    /// Timeout for one connector action, in seconds.
    pub connector_timeout_secs: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            agent_timeout_secs: 30,
            connector_timeout_secs: 60,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.agent_timeout_secs, 30);
        assert_eq!(config.connector_timeout_secs, 60);
    }
}
