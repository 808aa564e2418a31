//! Per-sink counters

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Metrics for a single sink
#[derive(Debug, Default)]
pub struct SinkMetrics {
    /// Rows waiting in the worker queue
    queue_len: AtomicUsize,
    /// Rows written successfully
    rows_written: AtomicU64,
    /// Rows the sink failed to write
    write_failures: AtomicU64,
    /// Rows dropped because the queue was full
    rows_dropped: AtomicU64,
    /// sim_key of the most recently written row
    last_sim_key: AtomicU64,
}

impl SinkMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_len(&self) -> usize {
        self.queue_len.load(Ordering::Relaxed)
    }

    pub fn set_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written.load(Ordering::Relaxed)
    }

    /// 记录一次成功写入
    pub fn record_written(&self, sim_key: u64) {
        self.rows_written.fetch_add(1, Ordering::Relaxed);
        self.last_sim_key.store(sim_key, Ordering::Relaxed);
    }

    pub fn write_failures(&self) -> u64 {
        self.write_failures.load(Ordering::Relaxed)
    }

    pub fn inc_write_failures(&self) {
        self.write_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn rows_dropped(&self) -> u64 {
        self.rows_dropped.load(Ordering::Relaxed)
    }

    pub fn inc_rows_dropped(&self) {
        self.rows_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn last_sim_key(&self) -> u64 {
        self.last_sim_key.load(Ordering::Relaxed)
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queue_len: self.queue_len(),
            rows_written: self.rows_written(),
            write_failures: self.write_failures(),
            rows_dropped: self.rows_dropped(),
            last_sim_key: self.last_sim_key(),
        }
    }
}

/// Snapshot of sink metrics (for reporting)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub queue_len: usize,
    pub rows_written: u64,
    pub write_failures: u64,
    pub rows_dropped: u64,
    pub last_sim_key: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_tracks_last_key() {
        let metrics = SinkMetrics::new();
        metrics.record_written(10);
        metrics.record_written(30);
        metrics.inc_rows_dropped();

        let snap = metrics.snapshot();
        assert_eq!(snap.rows_written, 2);
        assert_eq!(snap.rows_dropped, 1);
        assert_eq!(snap.write_failures, 0);
        assert_eq!(snap.last_sim_key, 30);
    }
}
