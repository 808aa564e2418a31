//! # Sync Engine
//!
//! 基于逻辑时间戳的多流同步核心。
//!
//! 负责：
//! - 按时间戳缓存每条流的记录 (`PerStreamBuffer`)
//! - 由外部释放信号控制的记录放行 (`ReleaseGate`)
//! - watermark 驱动的 N 路对齐 (`StreamSynchronizer`)
//!
//! ## 使用示例
//!
//! ```ignore
//! use std::sync::Arc;
//! use sync_engine::StreamSynchronizer;
//!
//! let sync = StreamSynchronizer::new(["pose", "tracking"])?
//!     .with_consumer(Arc::new(|tuple| println!("aligned {}", tuple.key)));
//!
//! sync.push("pose", key.clone(), pose)?;
//! sync.push("tracking", key.clone(), obstacles)?;
//! sync.on_stream_ready("pose", key.clone())?;
//! sync.on_stream_ready("tracking", key)?; // consumer runs here
//! ```

mod buffer;
mod error;
mod gate;
mod synchronizer;

pub use buffer::{BufferStats, PerStreamBuffer};
pub use error::SyncError;
pub use gate::{GateStats, OfferOutcome, ReleaseGate, ReleaseOutcome};
pub use synchronizer::{
    AlignedTuple, ReadyOutcome, ReadySignal, StreamSynchronizer, TupleConsumer,
};

// Re-export contracts types
pub use contracts::{StreamId, TimestampKey};
