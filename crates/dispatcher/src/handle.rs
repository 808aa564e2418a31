//! SinkHandle - one sink behind its own bounded queue and worker task

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, warn};

use contracts::{DataSink, MetricRow};

use crate::error::DispatcherError;
use crate::metrics::SinkMetrics;

/// Handle to a running sink worker
pub struct SinkHandle {
    name: String,
    tx: mpsc::Sender<MetricRow>,
    metrics: Arc<SinkMetrics>,
    worker_handle: JoinHandle<()>,
}

impl SinkHandle {
    /// Create a new SinkHandle and spawn the worker task
    pub fn spawn<S: DataSink + Send + 'static>(sink: S, queue_capacity: usize) -> Self {
        let name = sink.name().to_string();
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let metrics = Arc::new(SinkMetrics::new());

        let worker_metrics = Arc::clone(&metrics);
        let worker_name = name.clone();

        let worker_handle = tokio::spawn(async move {
            sink_worker(sink, rx, worker_metrics, worker_name).await;
        });

        Self {
            name,
            tx,
            metrics,
            worker_handle,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metrics(&self) -> &Arc<SinkMetrics> {
        &self.metrics
    }

    /// Queue a row for the worker without waiting
    ///
    /// A full queue drops the row and reports `QueueFull`.
    pub fn try_send(&self, row: MetricRow) -> Result<(), DispatcherError> {
        match self.tx.try_send(row) {
            Ok(()) => {
                self.metrics
                    .set_queue_len(self.tx.max_capacity() - self.tx.capacity());
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(row)) => {
                self.metrics.inc_rows_dropped();
                observability::record_row_dispatched(&self.name, false);
                warn!(
                    sink = %self.name,
                    sim_key = row.sim_key,
                    metric = %row.metric_name,
                    "Queue full, row dropped"
                );
                Err(DispatcherError::QueueFull {
                    sink_name: self.name.clone(),
                    metric_name: row.metric_name,
                    scope: row.scope,
                    sim_key: row.sim_key,
                })
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                error!(sink = %self.name, "Sink worker closed unexpectedly");
                Err(DispatcherError::WorkerClosed {
                    sink_name: self.name.clone(),
                })
            }
        }
    }

    /// Shutdown the sink worker, draining queued rows first
    #[instrument(name = "sink_handle_shutdown", skip(self), fields(sink = %self.name))]
    pub async fn shutdown(self) {
        drop(self.tx);
        if let Err(e) = self.worker_handle.await {
            error!(sink = %self.name, error = ?e, "Worker task panicked");
        }
        debug!(sink = %self.name, "SinkHandle shutdown complete");
    }
}

#[instrument(
    name = "sink_worker_loop",
    skip(sink, rx, metrics),
    fields(sink = %name)
)]
async fn sink_worker<S: DataSink>(
    mut sink: S,
    mut rx: mpsc::Receiver<MetricRow>,
    metrics: Arc<SinkMetrics>,
    name: String,
) {
    debug!(sink = %name, "Sink worker started");

    while let Some(row) = rx.recv().await {
        metrics.set_queue_len(rx.len());

        match sink.write(&row).await {
            Ok(()) => {
                metrics.record_written(row.sim_key);
                observability::record_row_dispatched(&name, true);
            }
            Err(e) => {
                // 单行失败不终止 worker
                metrics.inc_write_failures();
                observability::record_row_dispatched(&name, false);
                error!(
                    sink = %name,
                    sim_key = row.sim_key,
                    error = %e,
                    "Write failed"
                );
            }
        }
    }

    if let Err(e) = sink.flush().await {
        error!(sink = %name, error = %e, "Flush failed on shutdown");
    }
    if let Err(e) = sink.close().await {
        error!(sink = %name, error = %e, "Close failed on shutdown");
    }

    debug!(sink = %name, "Sink worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::ContractError;
    use std::sync::atomic::{AtomicU64, Ordering};
    use tokio::time::{sleep, Duration};

    struct MockSink {
        name: String,
        write_count: Arc<AtomicU64>,
        should_fail: bool,
        delay_ms: u64,
    }

    impl DataSink for MockSink {
        fn name(&self) -> &str {
            &self.name
        }

        async fn write(&mut self, _row: &MetricRow) -> Result<(), ContractError> {
            if self.delay_ms > 0 {
                sleep(Duration::from_millis(self.delay_ms)).await;
            }
            if self.should_fail {
                return Err(ContractError::sink_write(&self.name, "mock failure"));
            }
            self.write_count.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }

        async fn flush(&mut self) -> Result<(), ContractError> {
            Ok(())
        }

        async fn close(&mut self) -> Result<(), ContractError> {
            Ok(())
        }
    }

    fn row(sim_key: u64) -> MetricRow {
        MetricRow {
            wall_clock_ms: 0,
            sim_key,
            metric_name: "prediction".to_string(),
            scope: "MSD".to_string(),
            value: 0.5,
        }
    }

    #[tokio::test]
    async fn test_sink_handle_basic() {
        let write_count = Arc::new(AtomicU64::new(0));
        let sink = MockSink {
            name: "test".to_string(),
            write_count: Arc::clone(&write_count),
            should_fail: false,
            delay_ms: 0,
        };

        let handle = SinkHandle::spawn(sink, 10);
        let metrics = Arc::clone(handle.metrics());

        for i in 0..5 {
            assert!(handle.try_send(row(i)).is_ok());
        }

        handle.shutdown().await;
        assert_eq!(write_count.load(Ordering::Relaxed), 5);
        assert_eq!(metrics.rows_written(), 5);
        assert_eq!(metrics.last_sim_key(), 4);
    }

    #[tokio::test]
    async fn test_sink_handle_queue_full() {
        let sink = MockSink {
            name: "slow".to_string(),
            write_count: Arc::new(AtomicU64::new(0)),
            should_fail: false,
            delay_ms: 100,
        };

        let handle = SinkHandle::spawn(sink, 2);

        let mut rejected = 0;
        for i in 0..10 {
            if let Err(DispatcherError::QueueFull { sim_key, .. }) = handle.try_send(row(i)) {
                assert_eq!(sim_key, i);
                rejected += 1;
            }
        }

        assert!(rejected > 0);
        assert_eq!(handle.metrics().rows_dropped(), rejected);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_sink_handle_failure_isolation() {
        let sink = MockSink {
            name: "failing".to_string(),
            write_count: Arc::new(AtomicU64::new(0)),
            should_fail: true,
            delay_ms: 0,
        };

        let handle = SinkHandle::spawn(sink, 10);
        let metrics = Arc::clone(handle.metrics());

        for i in 0..3 {
            handle.try_send(row(i)).unwrap();
        }

        handle.shutdown().await;
        assert_eq!(metrics.write_failures(), 3);
        assert_eq!(metrics.rows_written(), 0);
    }
}
