//! EvaluationPipeline - synchronizer wired to the prediction evaluator

use contracts::{
    MetricRowCallback, ObstaclePrediction, ObstacleTrajectory, Pose, PredictionConfig,
    TimestampKey,
};
use parking_lot::Mutex;
use sync_engine::{ReadyOutcome, ReadySignal, StreamSynchronizer, SyncError};
use tracing::error;

use crate::{
    EvalError, EvalPayload, EvaluatorState, PredictionEvaluator, POSE_STREAM, PREDICTION_STREAM,
    TRACKING_STREAM,
};

/// Pose, tracking and prediction streams aligned into one evaluator
///
/// Producers push records and signal watermarks per stream. The watermark
/// call that completes a key scores it on the calling thread and returns
/// the evaluator's result.
pub struct EvaluationPipeline {
    synchronizer: StreamSynchronizer<EvalPayload>,
    evaluator: Mutex<PredictionEvaluator>,
}

impl EvaluationPipeline {
    pub fn new(
        config: &PredictionConfig,
        on_row: Option<MetricRowCallback>,
    ) -> Result<Self, EvalError> {
        let mut evaluator = PredictionEvaluator::new(config);
        if let Some(on_row) = on_row {
            evaluator = evaluator.with_row_callback(on_row);
        }
        let synchronizer =
            StreamSynchronizer::new([POSE_STREAM, TRACKING_STREAM, PREDICTION_STREAM])?;

        Ok(Self {
            synchronizer,
            evaluator: Mutex::new(evaluator),
        })
    }

    pub fn push_pose(&self, key: TimestampKey, pose: Pose) -> Result<(), EvalError> {
        Ok(self
            .synchronizer
            .push(POSE_STREAM, key, EvalPayload::Pose(pose))?)
    }

    pub fn push_tracking(
        &self,
        key: TimestampKey,
        tracking: Vec<ObstacleTrajectory>,
    ) -> Result<(), EvalError> {
        Ok(self
            .synchronizer
            .push(TRACKING_STREAM, key, EvalPayload::Tracking(tracking))?)
    }

    pub fn push_predictions(
        &self,
        key: TimestampKey,
        predictions: Vec<ObstaclePrediction>,
    ) -> Result<(), EvalError> {
        Ok(self
            .synchronizer
            .push(PREDICTION_STREAM, key, EvalPayload::Prediction(predictions))?)
    }

    /// Watermark for `key` on `stream`
    ///
    /// # Errors
    /// - `StarvedStream` if every stream signalled `key` but one has no record
    /// - other synchronizer errors
    /// - the evaluator error raised while scoring the key this call completed
    pub fn on_watermark(&self, stream: &str, key: TimestampKey) -> Result<ReadyOutcome, EvalError> {
        let signal = match self.synchronizer.signal_ready(stream, key) {
            Ok(signal) => signal,
            Err(SyncError::NotFound { stream, key }) => {
                return Err(EvalError::StarvedStream { stream, key })
            }
            Err(e) => return Err(e.into()),
        };

        let outcome = signal.outcome();
        if let ReadySignal::Complete(tuple) = signal {
            let key = tuple.key.clone();
            self.evaluator.lock().on_aligned(tuple).map_err(|e| {
                error!(key = %key, error = %e, "prediction evaluation failed");
                e
            })?;
        }
        Ok(outcome)
    }

    /// Watermark for `key` on all three streams
    pub fn on_watermark_all(&self, key: TimestampKey) -> Result<ReadyOutcome, EvalError> {
        let mut outcome = ReadyOutcome::Ignored;
        for stream in [POSE_STREAM, TRACKING_STREAM, PREDICTION_STREAM] {
            outcome = self.on_watermark(stream, key.clone())?;
        }
        Ok(outcome)
    }

    pub fn synchronizer(&self) -> &StreamSynchronizer<EvalPayload> {
        &self.synchronizer
    }

    pub fn state(&self) -> EvaluatorState {
        self.evaluator.lock().state()
    }

    pub fn score_passes(&self) -> u64 {
        self.evaluator.lock().score_passes()
    }
}
