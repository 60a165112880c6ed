//! Fire-and-forget reporter with bounded buffering and background flush.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{broadcast, Notify};
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep};
use tracing::{debug, warn};

use wayline_protocols::telemetry::{TelemetryEvent, TelemetrySink};

use crate::config::TelemetryConfig;
use crate::transport::TelemetryTransport;

struct ReporterInner {
    buffer: Mutex<VecDeque<TelemetryEvent>>,
    dropped: AtomicU64,
    flush_notify: Notify,
    config: TelemetryConfig,
}

/// Non-blocking telemetry reporter.
///
/// `report` enqueues into a bounded local buffer and returns immediately; a
/// background task flushes batches on an interval or when the buffer crosses
/// the flush threshold. Once the buffer is full, the oldest events are
/// dropped and a dropped-event counter is incremented - the counter itself
/// is reported on the next flush, so loss is observable, never silent.
pub struct Reporter {
    inner: Arc<ReporterInner>,
    shutdown_tx: broadcast::Sender<()>,
    flush_handle: Mutex<Option<JoinHandle<()>>>,
}

impl Reporter {
    /// Create a reporter and spawn its background flush task.
    pub fn spawn(config: TelemetryConfig, transport: Arc<dyn TelemetryTransport>) -> Self {
        let inner = Arc::new(ReporterInner {
            buffer: Mutex::new(VecDeque::with_capacity(config.buffer_capacity)),
            dropped: AtomicU64::new(0),
            flush_notify: Notify::new(),
            config,
        });

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = tokio::spawn(flush_loop(inner.clone(), transport, shutdown_rx));

        Self {
            inner,
            shutdown_tx,
            flush_handle: Mutex::new(Some(handle)),
        }
    }

    /// Enqueue an event. Never blocks, never fails.
    pub fn report(&self, event: TelemetryEvent) {
        let trigger_flush = {
            let mut buffer = self.inner.buffer.lock();
            if buffer.len() >= self.inner.config.buffer_capacity {
                buffer.pop_front();
                self.inner.dropped.fetch_add(1, Ordering::Relaxed);
            }
            buffer.push_back(event);
            buffer.len() >= self.inner.config.flush_threshold
        };

        if trigger_flush {
            self.inner.flush_notify.notify_one();
        }
    }

    /// Number of events dropped so far.
    pub fn dropped_count(&self) -> u64 {
        self.inner.dropped.load(Ordering::Relaxed)
    }

    /// Number of events currently buffered.
    pub fn buffered_count(&self) -> usize {
        self.inner.buffer.lock().len()
    }

    /// Flush remaining events and stop the background task.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
        let handle = self.flush_handle.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

impl TelemetrySink for Reporter {
    fn report(&self, event: TelemetryEvent) {
        Reporter::report(self, event);
    }
}

async fn flush_loop(
    inner: Arc<ReporterInner>,
    transport: Arc<dyn TelemetryTransport>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let mut ticker = interval(Duration::from_millis(inner.config.flush_interval_ms));

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                flush(&inner, transport.as_ref()).await;
                debug!("Reporter flush task stopped");
                break;
            }
            _ = ticker.tick() => {
                flush(&inner, transport.as_ref()).await;
            }
            _ = inner.flush_notify.notified() => {
                flush(&inner, transport.as_ref()).await;
            }
        }
    }
}

/// Drain the buffer and send one batch, retrying transport failures with
/// bounded backoff. An undeliverable batch is counted as dropped.
async fn flush(inner: &ReporterInner, transport: &dyn TelemetryTransport) {
    let mut batch: Vec<TelemetryEvent> = {
        let mut buffer = inner.buffer.lock();
        buffer.drain(..).collect()
    };

    let dropped = inner.dropped.swap(0, Ordering::Relaxed);
    if dropped > 0 {
        batch.push(TelemetryEvent::counter(
            "telemetry",
            "dropped_events",
            dropped as f64,
        ));
    }

    if batch.is_empty() {
        return;
    }

    let retry = &inner.config.retry;
    let mut attempt = 0;

    loop {
        match transport.send(batch.clone()).await {
            Ok(()) => return,
            Err(e) => {
                if attempt >= retry.max_retries {
                    warn!(
                        "Telemetry batch of {} events undeliverable, dropping: {}",
                        batch.len(),
                        e
                    );
                    inner
                        .dropped
                        .fetch_add(batch.len() as u64, Ordering::Relaxed);
                    return;
                }
                let delay = retry.delay_for_attempt(attempt);
                debug!(
                    "Telemetry transport failed (attempt {}), retrying in {:?}: {}",
                    attempt + 1,
                    delay,
                    e
                );
                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
#[path = "reporter_tests.rs"]
mod tests;
