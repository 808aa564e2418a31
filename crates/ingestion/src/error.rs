//! Ingestion 错误类型

use sync_engine::SyncError;
use thiserror::Error;

/// Ingestion 错误
#[derive(Debug, Error)]
pub enum IngestionError {
    /// 传感器回调没有携带任何数据
    #[error("sensor {sensor_id} delivered an empty payload at {capture_time_s}s")]
    EmptyPayload {
        /// 传感器 ID
        sensor_id: String,
        /// 采集时间 (秒)
        capture_time_s: f64,
    },

    /// 采集时间为负数或非有限值
    #[error("sensor {sensor_id} reported invalid capture time {capture_time_s}")]
    InvalidCaptureTime {
        sensor_id: String,
        capture_time_s: f64,
    },

    /// 传感器数据解析失败
    #[error("failed to decode sensor data: {message}")]
    DecodeFailed {
        /// 传感器 ID
        sensor_id: String,
        /// 错误消息
        message: String,
    },

    /// 闸门拒绝
    #[error("gate error: {0}")]
    Sync(#[from] SyncError),
}

impl IngestionError {
    /// 违反契约的错误，不可重试
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::EmptyPayload { .. } | Self::InvalidCaptureTime { .. } => true,
            Self::DecodeFailed { .. } => false,
            Self::Sync(e) => e.is_fatal(),
        }
    }
}

/// Ingestion Result 类型别名
pub type Result<T> = std::result::Result<T, IngestionError>;
