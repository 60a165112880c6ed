//! Telemetry event definitions and the reporting interface.
//!
//! Every component reports through a [`TelemetrySink`]; reporting is
//! fire-and-forget and must never block or fail the instrumented operation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Metric kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    /// Monotonically increasing.
    Counter,
    /// Can go up and down.
    Gauge,
    /// Sampled distribution.
    Histogram,
}

/// Unit of a metric value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricUnit {
    Count,
    Milliseconds,
    Bytes,
    Ratio,
}

impl Default for MetricUnit {
    fn default() -> Self {
        Self::Count
    }
}

/// A single telemetry event.
///
/// Events are ephemeral: they are aggregated by the control tower, not
/// individually persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryEvent {
    /// Reporting component.
    pub component_id: String,

    /// Execution the event relates to, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_id: Option<Uuid>,

    /// Metric name.
    pub metric_name: String,

    /// Metric kind.
    pub kind: MetricKind,

    /// Metric value.
    pub value: f64,

    /// Unit of the value.
    #[serde(default)]
    pub unit: MetricUnit,

    /// When the event was recorded.
    pub recorded_at: DateTime<Utc>,

    /// Tag map.
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

impl TelemetryEvent {
    fn new(
        component_id: impl Into<String>,
        metric_name: impl Into<String>,
        kind: MetricKind,
        value: f64,
        unit: MetricUnit,
    ) -> Self {
        Self {
            component_id: component_id.into(),
            execution_id: None,
            metric_name: metric_name.into(),
            kind,
            value,
            unit,
            recorded_at: Utc::now(),
            tags: HashMap::new(),
        }
    }

    /// Create a counter increment event.
    pub fn counter(
        component_id: impl Into<String>,
        metric_name: impl Into<String>,
        value: f64,
    ) -> Self {
        Self::new(
            component_id,
            metric_name,
            MetricKind::Counter,
            value,
            MetricUnit::Count,
        )
    }

    /// Create a gauge event.
    pub fn gauge(
        component_id: impl Into<String>,
        metric_name: impl Into<String>,
        value: f64,
    ) -> Self {
        Self::new(
            component_id,
            metric_name,
            MetricKind::Gauge,
            value,
            MetricUnit::Count,
        )
    }

    /// Create a duration histogram sample in milliseconds.
    pub fn duration_ms(
        component_id: impl Into<String>,
        metric_name: impl Into<String>,
        millis: f64,
    ) -> Self {
        Self::new(
            component_id,
            metric_name,
            MetricKind::Histogram,
            millis,
            MetricUnit::Milliseconds,
        )
    }

    /// Attach an execution id.
    pub fn with_execution(mut self, execution_id: Uuid) -> Self {
        self.execution_id = Some(execution_id);
        self
    }

    /// Attach a tag.
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }
}

/// Fire-and-forget reporting interface implemented by the telemetry pipeline.
///
/// `report` returns immediately and never surfaces an error to the caller;
/// loss under pressure is bounded and observable through a dropped-event
/// counter, never silent.
pub trait TelemetrySink: Send + Sync {
    /// Report an event.
    fn report(&self, event: TelemetryEvent);
}

/// Sink that discards all events. Default wiring for tests and tools that
/// run without a control tower.
pub struct NoopSink;

impl TelemetrySink for NoopSink {
    fn report(&self, _event: TelemetryEvent) {}
}
