//! MetricRow - reporting record handed to sinks

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One reported metric value.
///
/// Persisted as `wall_clock_ms,sim_key,metric_name,scope,value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRow {
    /// Wall-clock time of the report (ms since epoch)
    pub wall_clock_ms: i64,

    /// Simulation key (primary coordinate of the TimestampKey)
    pub sim_key: u64,

    /// Operator / metric family name (e.g. "prediction")
    pub metric_name: String,

    /// Scope inside the family (e.g. "person-MSD", or a latency)
    pub scope: String,

    /// Metric value
    pub value: f64,
}

impl MetricRow {
    /// Delimited text form, four decimals for the value
    pub fn to_csv_line(&self) -> String {
        format!(
            "{},{},{},{},{:.4}",
            self.wall_clock_ms, self.sim_key, self.metric_name, self.scope, self.value
        )
    }
}

/// Callback receiving every emitted metric row
pub type MetricRowCallback = Arc<dyn Fn(MetricRow) + Send + Sync>;
