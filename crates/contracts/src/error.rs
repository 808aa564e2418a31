//! 合约层错误
//!
//! 按来源分组：配置、流、sink。

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContractError {
    /// 配置无法解析或序列化
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// 配置字段不合法
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    /// 下游流已没有接收端
    #[error("stream '{stream}' is closed")]
    StreamClosed { stream: String },

    /// 下游流已满
    #[error("stream '{stream}' is full (capacity {capacity})")]
    StreamFull { stream: String, capacity: usize },

    /// sink 写入失败
    #[error("sink '{sink_name}' write error: {message}")]
    SinkWrite { sink_name: String, message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ContractError {
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn stream_closed(stream: impl Into<String>) -> Self {
        Self::StreamClosed {
            stream: stream.into(),
        }
    }

    pub fn stream_full(stream: impl Into<String>, capacity: usize) -> Self {
        Self::StreamFull {
            stream: stream.into(),
            capacity,
        }
    }

    pub fn sink_write(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkWrite {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    /// 下游暂时无法接收，消费端追上后可再次发送
    pub fn is_backpressure(&self) -> bool {
        matches!(self, Self::StreamFull { .. })
    }
}
