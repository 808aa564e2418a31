//! # Ingestion
//!
//! Sensor sample ingestion module.
//!
//! Responsibilities:
//! - Adapt `SensorSource` callbacks to a `ReleaseGate` (`GatedSensorDriver`)
//! - Convert simulator capture time into millisecond `TimestampKey`s
//! - Reject empty payloads and serialize concurrent callbacks
//!
//! ## Usage Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use contracts::stream;
//! use ingestion::{GatedSensorDriver, MockSensorSource};
//! use sync_engine::ReleaseGate;
//!
//! let (points_tx, points_rx) = stream("lidar", 100);
//! let (release_tx, release_rx) = stream("lidar_release", 100);
//! let gate = Arc::new(ReleaseGate::new("lidar", Arc::new(points_tx), Arc::new(release_tx), false));
//!
//! let driver = GatedSensorDriver::raw(Arc::new(MockSensorSource::new("lidar", Default::default())), gate);
//! driver.start();
//!
//! // external synchronization signal
//! driver.on_release(key)?;
//! ```

mod driver;
mod error;
mod mock;

// Re-exports
pub use contracts::{RawSample, SensorSource};
pub use driver::{GatedSensorDriver, SampleDecoder, MAX_RETAINED_FAILURES};
pub use error::{IngestionError, Result};
pub use mock::{MockSensorConfig, MockSensorSource};
