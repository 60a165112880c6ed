//! HTTP export endpoint for control tower aggregates.

use std::sync::Arc;
use std::time::Duration;

use axum::{http::StatusCode, response::IntoResponse, Json};

use crate::tower::ControlTower;

/// Default window for export snapshots.
const DEFAULT_WINDOW: Duration = Duration::from_secs(300);

/// Aggregate export endpoint handler.
pub struct TowerEndpoint {
    tower: Arc<ControlTower>,
}

impl TowerEndpoint {
    /// Create a new export endpoint.
    pub fn new(tower: Arc<ControlTower>) -> Self {
        Self { tower }
    }

    /// Axum handler returning aggregate snapshots as JSON.
    pub async fn snapshot_handler(&self) -> impl IntoResponse {
        let snapshots = self.tower.snapshot_all(DEFAULT_WINDOW);
        (StatusCode::OK, Json(snapshots))
    }

    /// Axum handler returning a plain-text metrics dump.
    pub async fn text_handler(&self) -> impl IntoResponse {
        let text = self.export(DEFAULT_WINDOW);
        (
            StatusCode::OK,
            [("content-type", "text/plain; charset=utf-8")],
            text,
        )
    }

    /// Render all series as plain text, one line per series.
    pub fn export(&self, window: Duration) -> String {
        let mut output = String::new();
        for snapshot in self.tower.snapshot_all(window) {
            output.push_str(&format!(
                "{}.{} count={} sum={} min={} max={} mean={} last={} total={}\n",
                snapshot.component_id,
                snapshot.metric_name,
                snapshot.aggregate.count,
                snapshot.aggregate.sum,
                snapshot.aggregate.min,
                snapshot.aggregate.max,
                snapshot.aggregate.mean,
                snapshot.aggregate.last,
                snapshot.aggregate.total,
            ));
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TelemetryConfig;
    use wayline_protocols::telemetry::TelemetryEvent;

    #[tokio::test]
    async fn test_export_text() {
        let tower = ControlTower::spawn(TelemetryConfig::default());
        tower.ingest(TelemetryEvent::counter("engine", "submitted", 3.0));

        let endpoint = TowerEndpoint::new(tower.clone());
        let text = endpoint.export(Duration::from_secs(60));
        assert!(text.contains("engine.submitted"));
        assert!(text.contains("total=3"));

        tower.shutdown().await;
    }

    #[tokio::test]
    async fn test_export_empty() {
        let tower = ControlTower::spawn(TelemetryConfig::default());
        let endpoint = TowerEndpoint::new(tower.clone());
        assert!(endpoint.export(Duration::from_secs(60)).is_empty());
        tower.shutdown().await;
    }
}
