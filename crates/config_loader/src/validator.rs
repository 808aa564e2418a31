//! 配置校验模块
//!
//! 校验规则：
//! - 字段范围 (derive `Validate`)
//! - iou_thresholds 严格升序且位于 (0, 1]
//! - sink 名称非空且唯一
//! - csv sink 必须提供 path 参数
//! - 队列容量 > 0

use std::collections::HashSet;

use ::validator::{Validate, ValidationErrors};
use contracts::{ContractError, PipelineConfig, SinkType};

/// 校验 PipelineConfig 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(config: &PipelineConfig) -> Result<(), ContractError> {
    config.validate().map_err(field_error)?;
    validate_thresholds(config)?;
    validate_sinks(config)?;
    Ok(())
}

/// 将 derive 校验结果转换为 ContractError
fn field_error(errors: ValidationErrors) -> ContractError {
    let field = errors
        .errors()
        .keys()
        .next()
        .map(|k| k.to_string())
        .unwrap_or_else(|| "config".to_string());
    ContractError::config_validation(field, errors.to_string())
}

/// 校验 IoU 阈值
fn validate_thresholds(config: &PipelineConfig) -> Result<(), ContractError> {
    let thresholds = &config.decay.iou_thresholds;

    if let Some(t) = thresholds.iter().find(|t| !(**t > 0.0 && **t <= 1.0)) {
        return Err(ContractError::config_validation(
            "decay.iou_thresholds",
            format!("threshold must be in (0, 1], got {t}"),
        ));
    }

    if thresholds.windows(2).any(|w| w[0] >= w[1]) {
        return Err(ContractError::config_validation(
            "decay.iou_thresholds",
            "thresholds must be strictly ascending",
        ));
    }

    Ok(())
}

/// 校验 sink 配置
fn validate_sinks(config: &PipelineConfig) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, sink) in config.sinks.iter().enumerate() {
        if sink.name.is_empty() {
            return Err(ContractError::config_validation(
                format!("sinks[{}].name", idx),
                "sink name cannot be empty",
            ));
        }

        if !seen.insert(sink.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("sinks[name={}]", sink.name),
                "duplicate sink name",
            ));
        }

        if sink.queue_capacity == 0 {
            return Err(ContractError::config_validation(
                format!("sinks[{}].queue_capacity", sink.name),
                "queue_capacity must be > 0",
            ));
        }

        if sink.sink_type == SinkType::Csv && !sink.params.contains_key("path") {
            return Err(ContractError::config_validation(
                format!("sinks[{}].params.path", sink.name),
                "csv sink requires 'path' parameter",
            ));
        }
    }
    Ok(())
}
