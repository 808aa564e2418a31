//! Detection decay - accuracy of stale observations
//!
//! Every arrival is paired with each retained older arrival. The average
//! precision of the pair, over a ladder of IoU thresholds, tells how much
//! accuracy is lost when acting on an observation that is `latency` old.

use std::collections::VecDeque;
use std::fmt;

use contracts::{
    BoundingBox2D, DecayConfig, MetricRow, MetricRowCallback, Obstacle, ObstacleClass, Overlap,
    TimestampKey,
};
use observability::RunningStats;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::{precision_recall, rows, EvalError};

/// One scored (current, retained) pair
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecayObservation {
    /// Key of the arrival
    pub key: TimestampKey,
    /// `key - age_key` (ms)
    pub latency: u64,
    pub average_precision: f64,
}

/// Bounded-latency window of entity sets, oldest first
pub struct DecayWindowAccumulator<E> {
    max_latency: u64,
    thresholds: Vec<f64>,
    window: VecDeque<(TimestampKey, Vec<E>)>,
}

impl<E> fmt::Debug for DecayWindowAccumulator<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecayWindowAccumulator")
            .field("max_latency", &self.max_latency)
            .field("thresholds", &self.thresholds)
            .field("len", &self.window.len())
            .finish()
    }
}

impl<E: Overlap> DecayWindowAccumulator<E> {
    /// `thresholds` must be ascending and non-empty
    pub fn new(max_latency: u64, thresholds: Vec<f64>) -> Self {
        Self {
            max_latency,
            thresholds,
            window: VecDeque::new(),
        }
    }

    /// Score `entities` against the retained history, then retain them
    ///
    /// # Errors
    /// - `InvalidKey` for the top key
    /// - `NonMonotonicKey` if `key` precedes the newest retained key
    pub fn observe(
        &mut self,
        key: TimestampKey,
        entities: Vec<E>,
    ) -> Result<Vec<DecayObservation>, EvalError> {
        if key.is_top() {
            return Err(EvalError::InvalidKey { key });
        }
        if let Some((newest, _)) = self.window.back() {
            if key < *newest {
                return Err(EvalError::NonMonotonicKey {
                    previous: newest.clone(),
                    key,
                });
            }
        }

        while let Some((oldest, _)) = self.window.front() {
            match key.elapsed_since(oldest) {
                Some(latency) if latency > self.max_latency => {
                    self.window.pop_front();
                }
                _ => break,
            }
        }

        let mut observations = Vec::new();
        for (age_key, old_entities) in &self.window {
            if entities.is_empty() && old_entities.is_empty() {
                continue;
            }

            let precisions: Vec<f64> = self
                .thresholds
                .iter()
                .map(|t| precision_recall(&entities, old_entities, *t).precision)
                .collect();
            let average_precision = if precisions.is_empty() {
                0.0
            } else {
                precisions.iter().sum::<f64>() / precisions.len() as f64
            };
            debug!(?precisions, "precision per threshold");

            observations.push(DecayObservation {
                key: key.clone(),
                latency: key.elapsed_since(age_key).unwrap_or(0),
                average_precision,
            });
        }

        self.window.push_back((key, entities));
        Ok(observations)
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// Retained keys, oldest first
    pub fn keys(&self) -> Vec<TimestampKey> {
        self.window.iter().map(|(k, _)| k.clone()).collect()
    }

    pub fn max_latency(&self) -> u64 {
        self.max_latency
    }

    pub fn thresholds(&self) -> &[f64] {
        &self.thresholds
    }
}

/// 检测衰减评估器
///
/// 只保留指定类别的包围框，按延迟输出平均精度。
pub struct DetectionDecayEvaluator {
    operator_name: String,
    class: ObstacleClass,
    window: Mutex<DecayWindowAccumulator<BoundingBox2D>>,
    precision_stats: Mutex<RunningStats>,
    on_row: Option<MetricRowCallback>,
}

impl DetectionDecayEvaluator {
    pub fn new(config: &DecayConfig) -> Self {
        Self {
            operator_name: config.operator_name.clone(),
            class: config.class,
            window: Mutex::new(DecayWindowAccumulator::new(
                config.max_latency_ms,
                config.iou_thresholds.clone(),
            )),
            precision_stats: Mutex::new(RunningStats::default()),
            on_row: None,
        }
    }

    /// 设置 MetricRow 回调
    pub fn with_row_callback(mut self, on_row: MetricRowCallback) -> Self {
        self.on_row = Some(on_row);
        self
    }

    /// 处理一帧检测结果
    ///
    /// 返回本帧产生的所有观测，并通过回调发出对应的 MetricRow。
    #[instrument(
        name = "detection_decay_on_detections",
        skip(self, obstacles),
        fields(operator = %self.operator_name, key = %key, obstacles = obstacles.len())
    )]
    pub fn on_detections(
        &self,
        key: TimestampKey,
        obstacles: &[Obstacle],
    ) -> Result<Vec<DecayObservation>, EvalError> {
        let boxes: Vec<BoundingBox2D> = obstacles
            .iter()
            .filter(|o| o.class() == Some(self.class))
            .map(|o| o.bounding_box)
            .collect();

        let observations = self.window.lock().observe(key, boxes)?;

        let rows: Vec<MetricRow> = observations
            .iter()
            .map(|obs| {
                info!(
                    latency = obs.latency,
                    average_precision = obs.average_precision,
                    "decay observation"
                );
                observability::record_decay_observation(
                    &self.operator_name,
                    obs.latency,
                    obs.average_precision,
                );
                rows::metric_row(
                    &obs.key,
                    &self.operator_name,
                    obs.latency.to_string(),
                    obs.average_precision,
                )
            })
            .collect();

        {
            let mut stats = self.precision_stats.lock();
            for obs in &observations {
                stats.push(obs.average_precision);
            }
        }

        rows::emit(self.on_row.as_ref(), &rows);
        Ok(observations)
    }

    /// 平均精度的累计统计
    pub fn precision_stats(&self) -> RunningStats {
        self.precision_stats.lock().clone()
    }

    pub fn retained(&self) -> usize {
        self.window.lock().len()
    }
}
