//! Evaluation errors

use contracts::{ContractError, TimestampKey};
use sync_engine::SyncError;
use thiserror::Error;

/// Errors raised while scoring
#[derive(Debug, Error)]
pub enum EvalError {
    /// Predicted and ground-truth trajectories differ in length
    #[error("trajectory length mismatch: predicted {predicted}, ground truth {ground}")]
    LengthMismatch { predicted: usize, ground: usize },

    /// Trajectory without points
    #[error("empty trajectory")]
    EmptyTrajectory,

    /// Label outside the scored classes
    #[error("unexpected obstacle label '{label}'")]
    UnknownClass { label: String },

    /// A watermark arrived without a record on one of the input streams
    #[error("stream '{stream}' has no record for watermark {key}")]
    StarvedStream { stream: String, key: TimestampKey },

    /// Key older than the newest key already observed
    #[error("key {key} precedes previously observed key {previous}")]
    NonMonotonicKey {
        previous: TimestampKey,
        key: TimestampKey,
    },

    /// Key that cannot be scored (the top key)
    #[error("key {key} cannot be observed")]
    InvalidKey { key: TimestampKey },

    /// Predicted obstacle with no ground-truth trajectory
    #[error("no ground truth for obstacle {id}")]
    MissingGroundTruth { id: u64 },

    #[error("sync error: {0}")]
    Sync(#[from] SyncError),

    #[error("contract error: {0}")]
    Contract(#[from] ContractError),
}

impl EvalError {
    /// Contract violations; never retried
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::LengthMismatch { .. }
            | Self::UnknownClass { .. }
            | Self::StarvedStream { .. }
            | Self::NonMonotonicKey { .. }
            | Self::InvalidKey { .. } => true,
            Self::EmptyTrajectory | Self::MissingGroundTruth { .. } => false,
            Self::Sync(e) => e.is_fatal(),
            Self::Contract(e) => matches!(e, ContractError::StreamClosed { .. }),
        }
    }

    /// Per-entity errors: the entity is skipped, scoring continues
    pub fn is_skippable(&self) -> bool {
        matches!(self, Self::EmptyTrajectory | Self::MissingGroundTruth { .. })
    }

    pub(crate) fn starved(stream: impl Into<String>, key: &TimestampKey) -> Self {
        Self::StarvedStream {
            stream: stream.into(),
            key: key.clone(),
        }
    }
}
