//! Telemetry configuration.

use wayline_protocols::retry::RetryConfig;

/// Configuration for the reporter and control tower.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Maximum buffered events per reporter. When full, the oldest event is
    /// dropped and counted.
    pub buffer_capacity: usize,

    /// Background flush interval in milliseconds.
    pub flush_interval_ms: u64,

    /// Buffer size that triggers an early flush.
    pub flush_threshold: usize,

    /// How long the control tower keeps samples for windowed queries.
    pub retention_secs: u64,

    /// Capacity of the tower's ingest channel.
    pub channel_capacity: usize,

    /// Retry policy for transport failures.
    pub retry: RetryConfig,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: 1024,
            flush_interval_ms: 500,
            flush_threshold: 64,
            retention_secs: 900,
            channel_capacity: 64,
            retry: RetryConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = TelemetryConfig::default();
        assert_eq!(config.buffer_capacity, 1024);
        assert_eq!(config.flush_threshold, 64);
        assert!(config.flush_threshold < config.buffer_capacity);
    }
}
