//! 评估管线指标收集模块
//!
//! 闸门、同步器与评估器通过这里的函数记录运行指标，
//! [`RowMetricsAggregator`] 在内存中汇总已发出的 MetricRow。

use std::collections::BTreeMap;

use contracts::MetricRow;
use metrics::{counter, gauge, histogram};

/// 记录传感器样本到达
pub fn record_sample_received(sensor_id: &str) {
    counter!(
        "perception_eval_samples_received_total",
        "sensor_id" => sensor_id.to_string()
    )
    .increment(1);
}

/// 记录闸门接收一条记录
///
/// `gated` 为真表示记录被暂存等待释放。
pub fn record_gate_offer(stream: &str, gated: bool, pending: usize) {
    let mode = if gated { "gated" } else { "immediate" };
    counter!(
        "perception_eval_gate_offers_total",
        "stream" => stream.to_string(),
        "mode" => mode
    )
    .increment(1);
    gauge!("perception_eval_gate_pending", "stream" => stream.to_string()).set(pending as f64);
}

/// 记录闸门释放一条暂存记录
pub fn record_gate_release(stream: &str, pending: usize) {
    counter!("perception_eval_gate_releases_total", "stream" => stream.to_string()).increment(1);
    gauge!("perception_eval_gate_pending", "stream" => stream.to_string()).set(pending as f64);
}

/// 记录闸门丢弃一条暂存记录
pub fn record_gate_discard(stream: &str, pending: usize) {
    counter!("perception_eval_gate_discards_total", "stream" => stream.to_string()).increment(1);
    gauge!("perception_eval_gate_pending", "stream" => stream.to_string()).set(pending as f64);
}

/// 记录缓冲区深度
pub fn record_buffer_depth(stream: &str, depth: usize) {
    gauge!(
        "perception_eval_buffer_depth",
        "stream" => stream.to_string()
    )
    .set(depth as f64);
}

/// 记录按时间裁剪掉的记录数
pub fn record_buffer_pruned(stream: &str, count: usize) {
    if count > 0 {
        counter!(
            "perception_eval_buffer_pruned_total",
            "stream" => stream.to_string()
        )
        .increment(count as u64);
    }
}

/// 记录一次 readiness 处理结果
pub fn record_sync_outcome(emitted: bool) {
    counter!("perception_eval_sync_ready_total").increment(1);
    if emitted {
        counter!("perception_eval_sync_emitted_total").increment(1);
    }
}

/// 记录尚未凑齐的 key 数量
pub fn record_sync_pending(pending_keys: usize) {
    gauge!("perception_eval_sync_pending_keys").set(pending_keys as f64);
}

/// 记录一次衰减观测
pub fn record_decay_observation(operator: &str, latency_ms: u64, average_precision: f64) {
    counter!(
        "perception_eval_decay_observations_total",
        "operator" => operator.to_string()
    )
    .increment(1);
    histogram!(
        "perception_eval_decay_latency_ms",
        "operator" => operator.to_string()
    )
    .record(latency_ms as f64);
    histogram!(
        "perception_eval_decay_average_precision",
        "operator" => operator.to_string()
    )
    .record(average_precision);
}

/// 记录一次预测评分
pub fn record_prediction_pass(operator: &str, scored_entities: usize) {
    counter!(
        "perception_eval_prediction_passes_total",
        "operator" => operator.to_string()
    )
    .increment(1);
    histogram!(
        "perception_eval_prediction_entities",
        "operator" => operator.to_string()
    )
    .record(scored_entities as f64);
}

/// 记录被跳过的实体 (空轨迹 / 缺少真值)
pub fn record_prediction_skip(operator: &str, reason: &'static str) {
    counter!(
        "perception_eval_prediction_skipped_total",
        "operator" => operator.to_string(),
        "reason" => reason
    )
    .increment(1);
}

/// 记录 MetricRow 产生
pub fn record_row_emitted(metric_name: &str) {
    counter!(
        "perception_eval_rows_emitted_total",
        "metric" => metric_name.to_string()
    )
    .increment(1);
}

/// 记录 MetricRow 分发
pub fn record_row_dispatched(sink_name: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "perception_eval_rows_dispatched_total",
        "sink" => sink_name.to_string(),
        "status" => status
    )
    .increment(1);
}

/// MetricRow 聚合器
///
/// 按 (metric_name, scope) 在内存中聚合数值，便于统计和输出摘要。
#[derive(Debug, Clone, Default)]
pub struct RowMetricsAggregator {
    /// 总行数
    pub total_rows: u64,

    /// 各 (metric_name, scope) 的数值统计
    pub scope_stats: BTreeMap<(String, String), RunningStats>,
}

impl RowMetricsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 更新聚合统计
    pub fn update(&mut self, row: &MetricRow) {
        self.total_rows += 1;
        self.scope_stats
            .entry((row.metric_name.clone(), row.scope.clone()))
            .or_default()
            .push(row.value);
    }

    /// 查询某个 scope 的统计
    pub fn stats(&self, metric_name: &str, scope: &str) -> Option<&RunningStats> {
        self.scope_stats
            .get(&(metric_name.to_string(), scope.to_string()))
    }

    /// 生成摘要报告
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            total_rows: self.total_rows,
            scopes: self
                .scope_stats
                .iter()
                .map(|((name, scope), stats)| (format!("{name}/{scope}"), StatsSummary::from(stats)))
                .collect(),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_rows: u64,
    pub scopes: Vec<(String, StatsSummary)>,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Evaluation Metrics Summary ===")?;
        writeln!(f, "Total rows: {}", self.total_rows)?;
        for (scope, stats) in &self.scopes {
            writeln!(f, "  {}: {}", scope, stats)?;
        }
        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.4}, max={:.4}, mean={:.4}, std={:.4} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 样本方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(metric_name: &str, scope: &str, value: f64) -> MetricRow {
        MetricRow {
            wall_clock_ms: 0,
            sim_key: 0,
            metric_name: metric_name.to_string(),
            scope: scope.to_string(),
            value,
        }
    }

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();
        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            stats.push(v);
        }

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_aggregator_groups_by_scope() {
        let mut aggregator = RowMetricsAggregator::new();
        aggregator.update(&row("detection_decay", "50", 1.0));
        aggregator.update(&row("detection_decay", "50", 0.5));
        aggregator.update(&row("prediction", "MSD", 2.0));

        assert_eq!(aggregator.total_rows, 3);
        let decay = aggregator.stats("detection_decay", "50").unwrap();
        assert_eq!(decay.count(), 2);
        assert!((decay.mean() - 0.75).abs() < 1e-10);
        assert!(aggregator.stats("prediction", "ADE").is_none());

        aggregator.reset();
        assert_eq!(aggregator.total_rows, 0);
    }

    #[test]
    fn test_summary_display() {
        let mut aggregator = RowMetricsAggregator::new();
        aggregator.update(&row("prediction", "person-FDE", 1.5));

        let output = format!("{}", aggregator.summary());
        assert!(output.contains("Total rows: 1"));
        assert!(output.contains("prediction/person-FDE"));
        assert!(output.contains("mean=1.5000"));
    }
}
