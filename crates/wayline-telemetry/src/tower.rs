//! Control tower: fleet-wide rolling aggregation of telemetry events.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use wayline_protocols::telemetry::{MetricKind, MetricUnit, TelemetryEvent};

use crate::config::TelemetryConfig;
use crate::transport::ChannelTransport;

/// Key of one aggregated series.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeriesKey {
    pub component_id: String,
    pub metric_name: String,
}

/// Rolling state of one series.
///
/// Updates are commutative (totals and timestamped samples), so many
/// reporters can feed the same series without ordering coordination.
struct Series {
    kind: MetricKind,
    unit: MetricUnit,
    total: f64,
    last: f64,
    samples: VecDeque<(DateTime<Utc>, f64)>,
}

impl Series {
    fn new(kind: MetricKind, unit: MetricUnit) -> Self {
        Self {
            kind,
            unit,
            total: 0.0,
            last: 0.0,
            samples: VecDeque::new(),
        }
    }

    fn update(&mut self, event: &TelemetryEvent, retention: chrono::Duration) {
        match event.kind {
            MetricKind::Counter => self.total += event.value,
            MetricKind::Gauge => {}
            MetricKind::Histogram => self.total += event.value,
        }
        self.last = event.value;
        self.samples.push_back((event.recorded_at, event.value));

        let cutoff = Utc::now() - retention;
        while let Some((ts, _)) = self.samples.front() {
            if *ts < cutoff {
                self.samples.pop_front();
            } else {
                break;
            }
        }
    }

    fn aggregate(&self, cutoff: DateTime<Utc>) -> AggregateSnapshot {
        let mut count = 0u64;
        let mut sum = 0.0f64;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;

        for (ts, value) in &self.samples {
            if *ts >= cutoff {
                count += 1;
                sum += value;
                min = min.min(*value);
                max = max.max(*value);
            }
        }

        AggregateSnapshot {
            count,
            sum,
            min: if count > 0 { min } else { 0.0 },
            max: if count > 0 { max } else { 0.0 },
            mean: if count > 0 { sum / count as f64 } else { 0.0 },
            last: self.last,
            total: self.total,
        }
    }
}

/// Aggregate over one series' recent window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateSnapshot {
    /// Samples in the window.
    pub count: u64,
    /// Sum of in-window samples.
    pub sum: f64,
    /// Minimum in-window sample.
    pub min: f64,
    /// Maximum in-window sample.
    pub max: f64,
    /// Mean of in-window samples.
    pub mean: f64,
    /// Most recent value.
    pub last: f64,
    /// Lifetime total for counters and histogram sums.
    pub total: f64,
}

/// One series with its windowed aggregate, as returned by exports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesSnapshot {
    pub component_id: String,
    pub metric_name: String,
    pub kind: MetricKind,
    pub unit: MetricUnit,
    pub aggregate: AggregateSnapshot,
}

/// Fleet-wide telemetry aggregator.
///
/// An explicitly constructed, explicitly torn-down service instance passed
/// by reference to reporters - never an ambient singleton. Create it with
/// [`ControlTower::spawn`], hand [`ControlTower::channel_transport`] to
/// reporters, and call [`ControlTower::shutdown`] to tear it down.
pub struct ControlTower {
    series: DashMap<SeriesKey, Mutex<Series>>,
    retention: chrono::Duration,
    batch_tx: mpsc::Sender<Vec<TelemetryEvent>>,
    shutdown_tx: broadcast::Sender<()>,
    ingest_handle: Mutex<Option<JoinHandle<()>>>,
}

impl ControlTower {
    /// Create a control tower and spawn its ingest loop.
    pub fn spawn(config: TelemetryConfig) -> Arc<Self> {
        let (batch_tx, batch_rx) = mpsc::channel(config.channel_capacity);
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let tower = Arc::new(Self {
            series: DashMap::new(),
            retention: chrono::Duration::seconds(config.retention_secs as i64),
            batch_tx,
            shutdown_tx,
            ingest_handle: Mutex::new(None),
        });

        let handle = tokio::spawn(ingest_loop(tower.clone(), batch_rx, shutdown_rx));
        *tower.ingest_handle.lock() = Some(handle);

        info!("Control tower started");
        tower
    }

    /// Transport handing reporter batches to this tower.
    pub fn channel_transport(&self) -> ChannelTransport {
        ChannelTransport::new(self.batch_tx.clone())
    }

    /// Fold one event into its series.
    pub fn ingest(&self, event: TelemetryEvent) {
        let key = SeriesKey {
            component_id: event.component_id.clone(),
            metric_name: event.metric_name.clone(),
        };
        let series = self
            .series
            .entry(key)
            .or_insert_with(|| Mutex::new(Series::new(event.kind, event.unit)));
        series.lock().update(&event, self.retention);
    }

    /// Aggregate one series over a recent window. `None` for an unknown
    /// series.
    pub fn query(
        &self,
        component_id: &str,
        metric_name: &str,
        window: Duration,
    ) -> Option<AggregateSnapshot> {
        let key = SeriesKey {
            component_id: component_id.to_string(),
            metric_name: metric_name.to_string(),
        };
        let cutoff = Utc::now()
            - chrono::Duration::from_std(window).unwrap_or_else(|_| self.retention);
        self.series.get(&key).map(|s| s.lock().aggregate(cutoff))
    }

    /// Snapshot every series over a recent window.
    pub fn snapshot_all(&self, window: Duration) -> Vec<SeriesSnapshot> {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(window).unwrap_or_else(|_| self.retention);
        let mut snapshots: Vec<SeriesSnapshot> = self
            .series
            .iter()
            .map(|entry| {
                let series = entry.value().lock();
                SeriesSnapshot {
                    component_id: entry.key().component_id.clone(),
                    metric_name: entry.key().metric_name.clone(),
                    kind: series.kind,
                    unit: series.unit,
                    aggregate: series.aggregate(cutoff),
                }
            })
            .collect();
        snapshots.sort_by(|a, b| {
            (a.component_id.as_str(), a.metric_name.as_str())
                .cmp(&(b.component_id.as_str(), b.metric_name.as_str()))
        });
        snapshots
    }

    /// Stop the ingest loop.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
        let handle = self.ingest_handle.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
        info!("Control tower stopped");
    }
}

async fn ingest_loop(
    tower: Arc<ControlTower>,
    mut batch_rx: mpsc::Receiver<Vec<TelemetryEvent>>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                debug!("Control tower ingest loop stopped");
                break;
            }
            batch = batch_rx.recv() => {
                match batch {
                    Some(events) => {
                        for event in events {
                            tower.ingest(event);
                        }
                    }
                    None => break,
                }
            }
        }
    }
}
