//! Telemetry errors.

use thiserror::Error;

/// Telemetry error types. These never reach instrumented callers; they are
/// handled inside the pipeline.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Batch delivery failed.
    #[error("Transport failure: {0}")]
    Transport(String),

    /// The receiving end was torn down.
    #[error("Telemetry channel closed")]
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_display() {
        let err = TelemetryError::Transport("connection reset".to_string());
        assert!(err.to_string().contains("connection reset"));
    }
}
