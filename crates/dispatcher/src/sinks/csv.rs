//! CsvSink - appends metric rows to a delimited text file
//!
//! 每行格式: `wall_clock_ms,sim_key,metric_name,scope,value`，value 保留四位小数。

use contracts::{ContractError, DataSink, MetricRow};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::{debug, error, instrument};

/// Configuration for CsvSink
#[derive(Debug, Clone)]
pub struct CsvSinkConfig {
    /// Output file
    pub path: PathBuf,
    /// Keep existing content instead of truncating
    pub append: bool,
}

impl CsvSinkConfig {
    /// Create config from params map (`path`, optional `append`)
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, ContractError> {
        let path = params
            .get("path")
            .map(PathBuf::from)
            .ok_or_else(|| ContractError::config_validation("params.path", "missing csv path"))?;
        let append = params
            .get("append")
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Ok(Self { path, append })
    }
}

/// Sink that writes metric rows to a CSV file
pub struct CsvSink {
    name: String,
    path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl CsvSink {
    /// Open the output file, creating parent directories as needed
    pub fn new(name: impl Into<String>, config: CsvSinkConfig) -> std::io::Result<Self> {
        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(config.append)
            .truncate(!config.append)
            .open(&config.path)?;

        Ok(Self {
            name: name.into(),
            path: config.path,
            writer: Some(BufWriter::new(file)),
        })
    }

    /// Create from params map (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, ContractError> {
        let name = name.into();
        let config = CsvSinkConfig::from_params(params)?;
        Self::new(name.clone(), config).map_err(|e| ContractError::sink_write(&name, e.to_string()))
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn writer(&mut self) -> Result<&mut BufWriter<File>, ContractError> {
        let name = &self.name;
        self.writer
            .as_mut()
            .ok_or_else(|| ContractError::sink_write(name, "sink already closed"))
    }

    fn sink_error(&self, e: std::io::Error) -> ContractError {
        error!(sink = %self.name, path = %self.path.display(), error = %e, "CSV I/O failed");
        ContractError::sink_write(&self.name, e.to_string())
    }
}

impl DataSink for CsvSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "csv_sink_write",
        skip(self, row),
        fields(sink = %self.name, sim_key = row.sim_key)
    )]
    async fn write(&mut self, row: &MetricRow) -> Result<(), ContractError> {
        let line = row.to_csv_line();
        let result = writeln!(self.writer()?, "{line}");
        result.map_err(|e| self.sink_error(e))
    }

    #[instrument(name = "csv_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        let result = self.writer()?.flush();
        result.map_err(|e| self.sink_error(e))
    }

    #[instrument(name = "csv_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush().map_err(|e| self.sink_error(e))?;
        }
        debug!(sink = %self.name, "CsvSink closed");
        Ok(())
    }
}
