//! Ledger configuration.

use wayline_protocols::retry::RetryConfig;

/// Configuration for the state surface.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Capacity of each execution's subscribe channel.
    pub subscribe_capacity: usize,

    /// Retry policy for transient storage failures.
    pub retry: RetryConfig,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            subscribe_capacity: 64,
            retry: RetryConfig::default(),
        }
    }
}
