//! PipelineConfig - Config Loader 输出
//!
//! 描述完整的评估管线配置：释放闸门、检测衰减、轨迹预测评估、输出路由。

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::Validate;

use crate::ObstacleClass;

/// 配置版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// 完整的管线配置
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct PipelineConfig {
    /// 配置版本
    #[serde(default)]
    pub version: ConfigVersion,

    /// 释放闸门配置
    #[serde(default)]
    #[validate(nested)]
    pub gate: GateConfig,

    /// 检测衰减评估配置
    #[serde(default)]
    #[validate(nested)]
    pub decay: DecayConfig,

    /// 轨迹预测评估配置
    #[serde(default)]
    #[validate(nested)]
    pub prediction: PredictionConfig,

    /// 输出路由配置
    #[serde(default)]
    pub sinks: Vec<SinkConfig>,
}

/// 释放闸门配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GateConfig {
    /// 启动时即处于立即模式
    #[serde(default)]
    pub start_released: bool,

    /// 下游流的通道容量
    #[serde(default = "default_channel_capacity")]
    #[validate(range(min = 1))]
    pub channel_capacity: usize,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            start_released: false,
            channel_capacity: default_channel_capacity(),
        }
    }
}

fn default_channel_capacity() -> usize {
    100
}

/// 检测衰减评估配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DecayConfig {
    /// 最大保留延迟 (ms)
    #[serde(default = "default_max_latency_ms")]
    #[validate(range(min = 1))]
    pub max_latency_ms: u64,

    /// IoU 阈值列表 (升序)
    #[serde(default = "default_iou_thresholds")]
    #[validate(length(min = 1))]
    pub iou_thresholds: Vec<f64>,

    /// 参与评分的类别
    #[serde(default = "default_decay_class")]
    pub class: ObstacleClass,

    /// MetricRow 中的 metric_name
    #[serde(default = "default_decay_operator")]
    #[validate(length(min = 1))]
    pub operator_name: String,
}

impl Default for DecayConfig {
    fn default() -> Self {
        Self {
            max_latency_ms: default_max_latency_ms(),
            iou_thresholds: default_iou_thresholds(),
            class: default_decay_class(),
            operator_name: default_decay_operator(),
        }
    }
}

fn default_max_latency_ms() -> u64 {
    400
}

/// 0.1, 0.2, ..., 0.9
pub fn default_iou_thresholds() -> Vec<f64> {
    (1..10).map(|i| f64::from(i) / 10.0).collect()
}

fn default_decay_class() -> ObstacleClass {
    ObstacleClass::Person
}

fn default_decay_operator() -> String {
    "detection_decay".to_string()
}

/// 报告后是否清空聚合结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportMode {
    /// 每个 watermark 报告后清空
    #[default]
    PerWatermark,
    /// 跨 watermark 累计
    Cumulative,
}

/// 轨迹预测评估配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PredictionConfig {
    /// 预测步数，也是预热窗口长度
    #[serde(default = "default_num_future_steps")]
    #[validate(range(min = 1, max = 10000))]
    pub num_future_steps: usize,

    /// MetricRow 中的 metric_name
    #[serde(default = "default_prediction_operator")]
    #[validate(length(min = 1))]
    pub operator_name: String,

    /// 报告模式
    #[serde(default)]
    pub report_mode: ReportMode,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            num_future_steps: default_num_future_steps(),
            operator_name: default_prediction_operator(),
            report_mode: ReportMode::default(),
        }
    }
}

fn default_num_future_steps() -> usize {
    10
}

fn default_prediction_operator() -> String {
    "prediction".to_string()
}

/// Sink 输出配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Sink 名称
    pub name: String,

    /// Sink 类型
    pub sink_type: SinkType,

    /// 队列容量
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// 类型特定参数
    #[serde(default)]
    pub params: HashMap<String, String>,
}

fn default_queue_capacity() -> usize {
    100
}

/// Sink 类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// 结构化日志
    Log,
    /// CSV 文件 (params: path)
    Csv,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert!(!config.gate.start_released);
        assert_eq!(config.decay.max_latency_ms, 400);
        assert_eq!(config.decay.iou_thresholds.len(), 9);
        assert_eq!(config.decay.class, ObstacleClass::Person);
        assert_eq!(config.prediction.num_future_steps, 10);
        assert_eq!(config.prediction.report_mode, ReportMode::PerWatermark);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_thresholds_ascending() {
        let thresholds = default_iou_thresholds();
        assert!(thresholds.windows(2).all(|w| w[0] < w[1]));
        assert!((thresholds[0] - 0.1).abs() < 1e-12);
        assert!((thresholds[8] - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_zero_future_steps_rejected() {
        let mut config = PipelineConfig::default();
        config.prediction.num_future_steps = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deserialize_partial() {
        let json = r#"{"decay": {"max_latency_ms": 100}, "sinks": [{"name": "out", "sink_type": "csv"}]}"#;
        let config: PipelineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.decay.max_latency_ms, 100);
        assert_eq!(config.decay.operator_name, "detection_decay");
        assert_eq!(config.sinks[0].sink_type, SinkType::Csv);
        assert_eq!(config.sinks[0].queue_capacity, 100);
    }
}
