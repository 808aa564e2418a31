//! # Observability
//!
//! 可观测性模块：Tracing + Prometheus 指标。
//!
//! ## 功能
//!
//! - Tracing 初始化 (JSON/Pretty/Compact 格式)
//! - Prometheus 指标导出
//! - 闸门 / 同步器 / 评估器指标记录
//! - MetricRow 在线统计
//!
//! ## 使用示例
//!
//! ```ignore
//! let config = observability::ObservabilityConfig::from_env()?;
//! observability::init_with_config(config)?;
//!
//! let outcome = synchronizer.on_stream_ready(&stream_id, key)?;
//! observability::record_sync_outcome(outcome.is_emitted());
//! ```

pub mod metrics;

use std::net::SocketAddr;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub use crate::metrics::{
    record_buffer_depth, record_buffer_pruned, record_decay_observation, record_gate_discard,
    record_gate_offer, record_gate_release, record_prediction_pass, record_prediction_skip,
    record_row_dispatched, record_row_emitted, record_sample_received, record_sync_outcome,
    record_sync_pending, MetricsSummary, RowMetricsAggregator, RunningStats, StatsSummary,
};

/// 日志格式环境变量
pub const LOG_FORMAT_ENV: &str = "PERCEPTION_EVAL_LOG_FORMAT";
/// Prometheus 监听地址环境变量 (为空则禁用)
pub const METRICS_ADDR_ENV: &str = "PERCEPTION_EVAL_METRICS_ADDR";

/// 可观测性配置
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// 日志格式
    pub log_format: LogFormat,
    /// Prometheus 监听地址 (None = 禁用)
    pub metrics_addr: Option<SocketAddr>,
    /// RUST_LOG 未设置时的过滤规则
    pub default_filter: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Json,
            metrics_addr: None,
            default_filter: "info".to_string(),
        }
    }
}

impl ObservabilityConfig {
    /// 从环境变量读取，未设置的项取默认值
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(format) = std::env::var(LOG_FORMAT_ENV) {
            config.log_format = format.parse()?;
        }
        if let Ok(addr) = std::env::var(METRICS_ADDR_ENV) {
            if !addr.trim().is_empty() {
                let addr = addr
                    .parse()
                    .with_context(|| format!("invalid {METRICS_ADDR_ENV}: {addr}"))?;
                config.metrics_addr = Some(addr);
            }
        }

        Ok(config)
    }
}

/// 日志格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// JSON 结构化日志
    #[default]
    Json,
    /// 人类可读格式
    Pretty,
    /// 紧凑单行格式
    Compact,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            other => Err(anyhow!("unknown log format '{other}'")),
        }
    }
}

/// 初始化 Tracing，并按需安装 Prometheus recorder
///
/// 进程内只能成功调用一次。
pub fn init_with_config(config: ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.default_filter))
        .with_context(|| format!("invalid log filter '{}'", config.default_filter))?;

    // 只有一个格式层为 Some
    let json = (config.log_format == LogFormat::Json).then(|| {
        fmt::layer()
            .json()
            .with_target(true)
            .with_thread_names(true)
            .with_current_span(true)
    });
    let pretty = (config.log_format == LogFormat::Pretty).then(|| fmt::layer().pretty());
    let compact = (config.log_format == LogFormat::Compact).then(|| fmt::layer().compact());

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(pretty)
        .with(compact)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    if let Some(addr) = config.metrics_addr {
        install_metrics_exporter(addr)?;
    }

    tracing::info!(
        log_format = ?config.log_format,
        metrics_addr = ?config.metrics_addr,
        "Observability initialized"
    );
    Ok(())
}

/// 安装 Prometheus recorder 与 HTTP 监听
///
/// 用于 Tracing 已由其他模块初始化的场景。
pub fn install_metrics_exporter(addr: SocketAddr) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .with_context(|| format!("Failed to install Prometheus recorder on {addr}"))?;

    tracing::info!(%addr, "Prometheus metrics endpoint initialized");
    Ok(())
}

/// 测试用日志初始化，重复调用时静默忽略
pub fn init_for_tests() {
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::new("debug"))
        .with(fmt::layer().compact().with_test_writer())
        .try_init();
}
