//! # Evaluation
//!
//! 感知 / 预测评估算子。
//!
//! - [`precision_recall`]: 两组实体在 IoU 阈值下的精度与召回
//! - [`DecayWindowAccumulator`] / [`DetectionDecayEvaluator`]: 检测结果随延迟的精度衰减
//! - [`score`] / [`MetricAggregator`]: 轨迹 MSD / ADE / FDE 及按类别汇总
//! - [`PredictionEvaluator`] / [`EvaluationPipeline`]: 对齐 pose / tracking / prediction 三路流并评分
//!
//! 所有结果以 [`contracts::MetricRow`] 的形式通过回调发出。

mod decay;
mod error;
mod pipeline;
mod precision;
mod prediction;
mod rows;
mod trajectory;
pub mod transform;

pub use decay::{DecayObservation, DecayWindowAccumulator, DetectionDecayEvaluator};
pub use error::EvalError;
pub use pipeline::EvaluationPipeline;
pub use precision::{precision_recall, PrecisionRecall};
pub use prediction::{
    EvalPayload, EvaluatorState, PredictionEvaluator, POSE_STREAM, PREDICTION_STREAM,
    TRACKING_STREAM,
};
pub use trajectory::{score, MetricAggregator, TrajectoryScore};
