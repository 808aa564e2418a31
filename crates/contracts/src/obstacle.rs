//! Obstacle - 检测 / 跟踪 / 预测模型的输出实体
//!
//! 核心只关心两点：实体间的重叠度 (decay 评分) 与实体类别 (轨迹评分)。

use serde::{Deserialize, Serialize};

use crate::{BoundingBox2D, Transform};

/// 类别集合 (轨迹评分按类别聚合)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObstacleClass {
    Vehicle,
    Person,
}

impl ObstacleClass {
    /// 全部类别，按报告顺序
    pub const ALL: [ObstacleClass; 2] = [ObstacleClass::Vehicle, ObstacleClass::Person];

    /// 由模型标签推断类别，未知标签返回 `None`
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "car" | "bicycle" | "motorcycle" | "bus" | "truck" | "vehicle" => Some(Self::Vehicle),
            "person" => Some(Self::Person),
            _ => None,
        }
    }

    /// 报告中使用的名称
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vehicle => "vehicle",
            Self::Person => "person",
        }
    }
}

/// 检测到的障碍物
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    /// 跟踪 ID
    pub id: u64,

    /// 模型标签 (e.g. "person", "car")
    pub label: String,

    /// 2D 包围框
    pub bounding_box: BoundingBox2D,
}

impl Obstacle {
    pub fn new(id: u64, label: impl Into<String>, bounding_box: BoundingBox2D) -> Self {
        Self {
            id,
            label: label.into(),
            bounding_box,
        }
    }

    /// 标签对应的类别
    pub fn class(&self) -> Option<ObstacleClass> {
        ObstacleClass::from_label(&self.label)
    }
}

/// 跟踪得到的历史轨迹 (最旧 -> 最新，相对自车坐标)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObstacleTrajectory {
    pub id: u64,
    pub label: String,
    pub trajectory: Vec<Transform>,
}

/// 预测得到的未来轨迹 (最旧 -> 最新，相对自车坐标)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObstaclePrediction {
    pub id: u64,
    pub label: String,

    /// 预测置信度
    #[serde(default = "default_probability")]
    pub probability: f64,

    pub predicted_trajectory: Vec<Transform>,
}

fn default_probability() -> f64 {
    1.0
}
