//! Sync engine errors

use contracts::{ContractError, TimestampKey};
use thiserror::Error;

/// Errors raised by buffers, gates and the synchronizer
#[derive(Debug, Error)]
pub enum SyncError {
    /// A record is already buffered under this key
    #[error("stream '{stream}' already holds a record for key {key}")]
    DuplicateKey { stream: String, key: TimestampKey },

    /// No record buffered under this key
    #[error("stream '{stream}' has no record for key {key}")]
    NotFound { stream: String, key: TimestampKey },

    /// Stream signalled readiness twice for the same key
    #[error("stream '{stream}' already reported ready for key {key}")]
    DuplicateReady { stream: String, key: TimestampKey },

    /// Release or discard of a key that holds no pending record
    #[error("gate '{gate}' has no pending record for key {key}")]
    MissingSnapshot { gate: String, key: TimestampKey },

    /// Stream id is not part of the synchronizer
    #[error("unknown stream '{stream}'")]
    UnknownStream { stream: String },

    /// Synchronizer construction with an unusable stream set
    #[error("invalid stream set: {reason}")]
    InvalidStreams { reason: String },

    /// Downstream stream rejected a message
    #[error("downstream error: {0}")]
    Downstream(#[from] ContractError),
}

impl SyncError {
    /// Contract violations; never retried
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::DuplicateKey { .. }
            | Self::DuplicateReady { .. }
            | Self::MissingSnapshot { .. }
            | Self::UnknownStream { .. }
            | Self::InvalidStreams { .. } => true,
            Self::NotFound { .. } => false,
            Self::Downstream(e) => !e.is_backpressure(),
        }
    }

    pub(crate) fn duplicate_key(stream: impl Into<String>, key: &TimestampKey) -> Self {
        Self::DuplicateKey {
            stream: stream.into(),
            key: key.clone(),
        }
    }

    pub(crate) fn not_found(stream: impl Into<String>, key: &TimestampKey) -> Self {
        Self::NotFound {
            stream: stream.into(),
            key: key.clone(),
        }
    }

    pub(crate) fn missing_snapshot(gate: impl Into<String>, key: &TimestampKey) -> Self {
        Self::MissingSnapshot {
            gate: gate.into(),
            key: key.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        let key = TimestampKey::from_millis(10);
        assert!(SyncError::duplicate_key("s", &key).is_fatal());
        assert!(SyncError::missing_snapshot("g", &key).is_fatal());
        assert!(!SyncError::not_found("s", &key).is_fatal());
        assert!(SyncError::from(ContractError::stream_closed("out")).is_fatal());
        assert!(!SyncError::from(ContractError::stream_full("out", 4)).is_fatal());
    }

    #[test]
    fn test_display_includes_key() {
        let err = SyncError::not_found("pose", &TimestampKey::from_millis(42));
        assert_eq!(err.to_string(), "stream 'pose' has no record for key [42]");
    }
}
