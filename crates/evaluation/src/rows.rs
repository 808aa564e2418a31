//! MetricRow construction and emission

use contracts::{MetricRow, MetricRowCallback, TimestampKey};

/// Wall-clock milliseconds since epoch
pub(crate) fn wall_clock_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub(crate) fn metric_row(
    key: &TimestampKey,
    metric_name: &str,
    scope: impl Into<String>,
    value: f64,
) -> MetricRow {
    MetricRow {
        wall_clock_ms: wall_clock_ms(),
        sim_key: key.primary().unwrap_or(0),
        metric_name: metric_name.to_string(),
        scope: scope.into(),
        value,
    }
}

/// Hand rows to the callback, if any
pub(crate) fn emit(callback: Option<&MetricRowCallback>, rows: &[MetricRow]) {
    for row in rows {
        observability::record_row_emitted(&row.metric_name);
        if let Some(callback) = callback {
            callback(row.clone());
        }
    }
}
