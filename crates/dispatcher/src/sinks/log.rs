//! LogSink - reports each metric row as a tracing event

use contracts::{ContractError, DataSink, MetricRow};
use tracing::{info, instrument};

/// Sink that logs metric rows
pub struct LogSink {
    name: String,
    rows: u64,
}

impl LogSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: 0,
        }
    }

    /// Rows logged so far
    pub fn rows(&self) -> u64 {
        self.rows
    }
}

impl DataSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sink_write",
        skip(self, row),
        fields(sink = %self.name, sim_key = row.sim_key)
    )]
    async fn write(&mut self, row: &MetricRow) -> Result<(), ContractError> {
        self.rows += 1;
        info!(
            sink = %self.name,
            wall_clock_ms = row.wall_clock_ms,
            sim_key = row.sim_key,
            metric = %row.metric_name,
            scope = %row.scope,
            value = row.value,
            "MetricRow"
        );
        Ok(())
    }

    #[instrument(name = "log_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    #[instrument(name = "log_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        info!(sink = %self.name, rows = self.rows, "LogSink closed");
        Ok(())
    }
}
