//! Cooperative cancellation signal.

use std::sync::atomic::{AtomicBool, Ordering};

/// Signal for cancelling an execution.
///
/// Cancellation is cooperative: the flag is observed at intent-boundary
/// checkpoints; in-flight connector actions are not forcibly aborted.
pub struct CancelSignal {
    cancelled: AtomicBool,
}

impl CancelSignal {
    /// Create a new cancel signal.
    pub fn new() -> Self {
        Self {
            cancelled: AtomicBool::new(false),
        }
    }

    /// Check if cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Trigger cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_cancel_signal() {
        let signal = CancelSignal::new();
        assert!(!signal.is_cancelled());
        signal.cancel();
        assert!(signal.is_cancelled());
    }

    #[test]
    fn test_cancel_idempotent() {
        let signal = CancelSignal::new();
        signal.cancel();
        signal.cancel();
        assert!(signal.is_cancelled());
    }

    #[test]
    fn test_cancel_shared() {
        let signal = Arc::new(CancelSignal::new());
        let other = signal.clone();
        other.cancel();
        assert!(signal.is_cancelled());
    }
}
