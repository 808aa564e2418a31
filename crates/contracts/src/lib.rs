//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the workspace.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Time Model
//! - All buffered records are keyed by a logical [`TimestampKey`], never wall-clock time
//! - Simulator capture times are converted with [`TimestampKey::from_seconds`] (milliseconds)
//! - The distinguished top key initializes a stream and carries no data

mod config;
mod error;
mod geometry;
mod obstacle;
mod row;
mod sensor_source;
mod sink;
mod stream;
mod stream_id;
mod timestamp;

pub use config::*;
pub use error::*;
pub use geometry::*;
pub use obstacle::*;
pub use row::{MetricRow, MetricRowCallback};
pub use sensor_source::{RawSample, SampleCallback, SensorSource};
pub use sink::*;
pub use stream::{stream, ReadStream, StreamMessage, StreamWriter, WriteStream};
pub use stream_id::StreamId;
pub use timestamp::TimestampKey;
