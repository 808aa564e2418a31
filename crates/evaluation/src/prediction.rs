//! PredictionEvaluator - multi-horizon trajectory error over aligned streams
//!
//! Each watermark delivers one pose, one ground-truth tracking set and one
//! prediction batch. Prediction batches are kept in a window of
//! `num_future_steps` entries; once the window is full, every watermark
//! scores the oldest batch against the current ground truth.

use std::collections::HashMap;

use contracts::{
    MetricRow, MetricRowCallback, ObstaclePrediction, ObstacleTrajectory, Point2, Pose,
    PredictionConfig, ReportMode, TimestampKey, Transform,
};
use ringbuf::{traits::*, HeapRb};
use sync_engine::AlignedTuple;
use tracing::{debug, info, instrument, warn};

use crate::{rows, score, transform, EvalError, MetricAggregator};

/// Stream carrying the ego pose
pub const POSE_STREAM: &str = "pose";
/// Stream carrying ground-truth obstacle trajectories
pub const TRACKING_STREAM: &str = "tracking";
/// Stream carrying obstacle predictions
pub const PREDICTION_STREAM: &str = "prediction";

/// Payload of the three evaluation streams
#[derive(Debug, Clone, PartialEq)]
pub enum EvalPayload {
    Pose(Pose),
    Tracking(Vec<ObstacleTrajectory>),
    Prediction(Vec<ObstaclePrediction>),
}

/// Evaluator phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluatorState {
    /// Fewer than `num_future_steps` prediction batches seen
    WaitingWarmup,
    /// Every watermark produces a score pass
    Scoring,
}

/// Trajectory prediction evaluator
pub struct PredictionEvaluator {
    operator_name: String,
    num_future_steps: usize,
    report_mode: ReportMode,
    state: EvaluatorState,
    /// Prediction batches in world coordinates, oldest first
    predictions: HeapRb<Vec<ObstaclePrediction>>,
    aggregator: MetricAggregator,
    watermarks: u64,
    score_passes: u64,
    on_row: Option<MetricRowCallback>,
}

impl PredictionEvaluator {
    pub fn new(config: &PredictionConfig) -> Self {
        let num_future_steps = config.num_future_steps.max(1);
        Self {
            operator_name: config.operator_name.clone(),
            num_future_steps,
            report_mode: config.report_mode,
            state: EvaluatorState::WaitingWarmup,
            predictions: HeapRb::new(num_future_steps),
            aggregator: MetricAggregator::new(config.operator_name.clone()),
            watermarks: 0,
            score_passes: 0,
            on_row: None,
        }
    }

    pub fn with_row_callback(mut self, on_row: MetricRowCallback) -> Self {
        self.on_row = Some(on_row);
        self
    }

    pub fn state(&self) -> EvaluatorState {
        self.state
    }

    pub fn watermarks(&self) -> u64 {
        self.watermarks
    }

    pub fn score_passes(&self) -> u64 {
        self.score_passes
    }

    pub fn aggregator(&self) -> &MetricAggregator {
        &self.aggregator
    }

    /// Process one aligned tuple of the pose / tracking / prediction streams
    ///
    /// # Errors
    /// `StarvedStream` if a stream's record is missing or of the wrong kind,
    /// plus everything [`PredictionEvaluator::on_watermark`] returns.
    pub fn on_aligned(
        &mut self,
        mut tuple: AlignedTuple<EvalPayload>,
    ) -> Result<Vec<MetricRow>, EvalError> {
        let key = tuple.key.clone();
        let pose = match tuple.take(POSE_STREAM) {
            Some(EvalPayload::Pose(pose)) => pose,
            _ => return Err(EvalError::starved(POSE_STREAM, &key)),
        };
        let tracking = match tuple.take(TRACKING_STREAM) {
            Some(EvalPayload::Tracking(tracking)) => tracking,
            _ => return Err(EvalError::starved(TRACKING_STREAM, &key)),
        };
        let predictions = match tuple.take(PREDICTION_STREAM) {
            Some(EvalPayload::Prediction(predictions)) => predictions,
            _ => return Err(EvalError::starved(PREDICTION_STREAM, &key)),
        };
        self.on_watermark(key, pose, tracking, predictions)
    }

    /// Process the records of one watermark
    ///
    /// Returns the rows of this watermark's score pass (empty while warming
    /// up or for the top key).
    ///
    /// # Errors
    /// `LengthMismatch` and `UnknownClass` abort the pass. Empty trajectories
    /// and predictions without ground truth are skipped.
    #[instrument(
        name = "prediction_eval_on_watermark",
        skip(self, pose, tracking, predictions),
        fields(operator = %self.operator_name, key = %key)
    )]
    pub fn on_watermark(
        &mut self,
        key: TimestampKey,
        pose: Pose,
        tracking: Vec<ObstacleTrajectory>,
        predictions: Vec<ObstaclePrediction>,
    ) -> Result<Vec<MetricRow>, EvalError> {
        if key.is_top() {
            return Ok(Vec::new());
        }
        self.watermarks += 1;

        let ego = pose.transform;
        let batch: Vec<ObstaclePrediction> = predictions
            .into_iter()
            .map(|mut p| {
                p.predicted_trajectory = world_trajectory(&ego, &p.predicted_trajectory);
                p
            })
            .collect();
        self.predictions.push_overwrite(batch);

        if self.state == EvaluatorState::WaitingWarmup
            && self.predictions.occupied_len() == self.num_future_steps
        {
            self.state = EvaluatorState::Scoring;
            info!(
                num_future_steps = self.num_future_steps,
                "warm-up complete, scoring predictions"
            );
        }

        if self.state == EvaluatorState::WaitingWarmup {
            debug!(
                buffered = self.predictions.occupied_len(),
                "waiting for warm-up"
            );
            return Ok(Vec::new());
        }

        let ground: HashMap<u64, Vec<Point2>> = tracking
            .into_iter()
            .map(|t| {
                let points = world_trajectory(&ego, &t.trajectory)
                    .iter()
                    .map(|tr| Point2::from(tr.location))
                    .collect();
                (t.id, points)
            })
            .collect();

        let rows = self.score_oldest(&key, &ground)?;
        rows::emit(self.on_row.as_ref(), &rows);
        Ok(rows)
    }

    fn score_oldest(
        &mut self,
        key: &TimestampKey,
        ground: &HashMap<u64, Vec<Point2>>,
    ) -> Result<Vec<MetricRow>, EvalError> {
        let Some(oldest) = self.predictions.iter().next() else {
            return Ok(Vec::new());
        };

        // 整个批次成功后才并入累计值
        let mut pass = MetricAggregator::new(self.operator_name.clone());
        let mut scored = 0;
        for prediction in oldest {
            match score_entity(prediction, ground) {
                Ok(entity_score) => {
                    pass.record(&prediction.label, &entity_score)?;
                    scored += 1;
                }
                Err(e) if e.is_skippable() => {
                    warn!(obstacle_id = prediction.id, error = %e, "obstacle skipped");
                    observability::record_prediction_skip(&self.operator_name, skip_reason(&e));
                }
                Err(e) => return Err(e),
            }
        }

        self.aggregator.merge(&pass);
        self.score_passes += 1;
        observability::record_prediction_pass(&self.operator_name, scored);

        let rows = self.aggregator.report(key);
        for row in &rows {
            info!(scope = %row.scope, value = row.value, "prediction metric");
        }
        if self.report_mode == ReportMode::PerWatermark {
            self.aggregator.reset();
        }
        Ok(rows)
    }
}

/// Score one predicted obstacle against its ground truth
fn score_entity(
    prediction: &ObstaclePrediction,
    ground: &HashMap<u64, Vec<Point2>>,
) -> Result<crate::TrajectoryScore, EvalError> {
    let ground_points = ground
        .get(&prediction.id)
        .ok_or(EvalError::MissingGroundTruth { id: prediction.id })?;

    // unknown labels abort the pass before any distance is computed
    contracts::ObstacleClass::from_label(&prediction.label).ok_or_else(|| {
        EvalError::UnknownClass {
            label: prediction.label.clone(),
        }
    })?;

    let predicted: Vec<Point2> = prediction
        .predicted_trajectory
        .iter()
        .map(|t| Point2::from(t.location))
        .collect();

    // compare the most recent ground-truth points
    let start = ground_points.len().saturating_sub(predicted.len());
    score(&predicted, &ground_points[start..])
}

fn world_trajectory(ego: &Transform, trajectory: &[Transform]) -> Vec<Transform> {
    trajectory
        .iter()
        .map(|t| transform::to_world(ego, t))
        .collect()
}

fn skip_reason(error: &EvalError) -> &'static str {
    match error {
        EvalError::EmptyTrajectory => "empty_trajectory",
        _ => "missing_ground_truth",
    }
}
