//! # Dispatcher
//!
//! 指标分发模块。
//!
//! 负责：
//! - 消费评估器产生的 `MetricRow`
//! - Fan-out 到多个 sinks (CSV 文件、日志)
//! - 隔离慢 sink，不阻塞评估链路

pub mod dispatcher;
pub mod error;
pub mod handle;
pub mod metrics;
pub mod sinks;

pub use contracts::{DataSink, MetricRow};
pub use dispatcher::{create_dispatcher, row_callback, Dispatcher, DispatcherBuilder, DispatcherConfig};
pub use error::DispatcherError;
pub use handle::SinkHandle;
pub use metrics::{MetricsSnapshot, SinkMetrics};
pub use sinks::{CsvSink, CsvSinkConfig, LogSink};
