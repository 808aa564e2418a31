//! 配置解析模块
//!
//! TOML 为主，JSON 可选。解析与序列化对任意 serde 类型通用，
//! 既可读完整的 `PipelineConfig`，也可单独读某个配置段。

use std::path::Path;

use contracts::ContractError;
use serde::{de::DeserializeOwned, Serialize};

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    /// 从文件扩展名推断格式
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    /// 从路径推断格式
    ///
    /// # Errors
    /// 无扩展名或扩展名不受支持时返回 `ConfigParse`
    pub fn from_path(path: &Path) -> Result<Self, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse(format!(
                "cannot determine config format of {}",
                path.display()
            ))
        })?;

        Self::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Toml => "TOML",
            Self::Json => "JSON",
        }
    }
}

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// 按格式反序列化
pub fn parse<T: DeserializeOwned>(content: &str, format: ConfigFormat) -> Result<T, ContractError> {
    let parsed: Result<T, BoxError> = match format {
        ConfigFormat::Toml => toml::from_str(content).map_err(Into::into),
        ConfigFormat::Json => serde_json::from_str(content).map_err(Into::into),
    };

    parsed.map_err(|e| ContractError::ConfigParse {
        message: format!("{} parse error: {e}", format.name()),
        source: Some(e),
    })
}

/// 按格式序列化 (pretty)
pub fn render<T: Serialize>(value: &T, format: ConfigFormat) -> Result<String, ContractError> {
    let rendered = match format {
        ConfigFormat::Toml => toml::to_string_pretty(value).map_err(|e| e.to_string()),
        ConfigFormat::Json => serde_json::to_string_pretty(value).map_err(|e| e.to_string()),
    };

    rendered.map_err(|e| {
        ContractError::config_parse(format!("{} serialize error: {e}", format.name()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{DecayConfig, PipelineConfig};

    #[test]
    fn test_parse_toml_minimal() {
        let content = r#"
[decay]
max_latency_ms = 100

[[sinks]]
name = "log_sink"
sink_type = "log"
"#;
        let config: PipelineConfig = parse(content, ConfigFormat::Toml).unwrap();
        assert_eq!(config.decay.max_latency_ms, 100);
        assert_eq!(config.sinks.len(), 1);
    }

    #[test]
    fn test_parse_json_minimal() {
        let content = r#"{
            "gate": { "start_released": true },
            "prediction": { "num_future_steps": 3 },
            "sinks": [{ "name": "log", "sink_type": "log" }]
        }"#;
        let config: PipelineConfig = parse(content, ConfigFormat::Json).unwrap();
        assert!(config.gate.start_released);
        assert_eq!(config.prediction.num_future_steps, 3);
    }

    #[test]
    fn test_parse_single_section() {
        let decay: DecayConfig =
            parse("max_latency_ms = 250\nclass = \"vehicle\"\n", ConfigFormat::Toml).unwrap();
        assert_eq!(decay.max_latency_ms, 250);
        assert_eq!(decay.operator_name, "detection_decay");
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let err = parse::<PipelineConfig>("invalid toml [[[", ConfigFormat::Toml).unwrap_err();
        assert!(matches!(err, ContractError::ConfigParse { source: Some(_), .. }));
        assert!(err.to_string().contains("TOML"));
    }

    #[test]
    fn test_parse_unknown_sink_type() {
        let content = r#"
[[sinks]]
name = "net"
sink_type = "udp"
"#;
        assert!(parse::<PipelineConfig>(content, ConfigFormat::Toml).is_err());
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            ConfigFormat::from_path(Path::new("a/pipeline.TOML")).unwrap(),
            ConfigFormat::Toml
        );
        assert_eq!(
            ConfigFormat::from_path(Path::new("pipeline.json")).unwrap(),
            ConfigFormat::Json
        );
        assert!(ConfigFormat::from_path(Path::new("pipeline.yaml")).is_err());
        assert!(ConfigFormat::from_path(Path::new("pipeline")).is_err());
    }
}
