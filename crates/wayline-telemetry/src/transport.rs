//! Batch transport seam between reporters and the control tower.

use async_trait::async_trait;
use tokio::sync::mpsc;

use wayline_protocols::telemetry::TelemetryEvent;

use crate::error::TelemetryError;

/// Transport for event batches.
#[async_trait]
pub trait TelemetryTransport: Send + Sync {
    /// Deliver a batch of events.
    async fn send(&self, batch: Vec<TelemetryEvent>) -> Result<(), TelemetryError>;
}

/// In-process transport delivering batches into a control tower's ingest
/// channel.
#[derive(Clone)]
pub struct ChannelTransport {
    tx: mpsc::Sender<Vec<TelemetryEvent>>,
}

impl ChannelTransport {
    /// Create a transport over an ingest channel.
    pub fn new(tx: mpsc::Sender<Vec<TelemetryEvent>>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl TelemetryTransport for ChannelTransport {
    async fn send(&self, batch: Vec<TelemetryEvent>) -> Result<(), TelemetryError> {
        self.tx.send(batch).await.map_err(|_| TelemetryError::Closed)
    }
}
