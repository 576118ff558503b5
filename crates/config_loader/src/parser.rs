//! 配置解析模块
//!
//! 支持 TOML (主要) 和 JSON (可选) 格式。

use contracts::{ContractError, EngineConfig};

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML 格式 (推荐)
    Toml,
    /// JSON 格式
    Json,
}

impl ConfigFormat {
    /// 从文件扩展名推断格式
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

pub fn parse_toml(content: &str) -> Result<EngineConfig, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

pub fn parse_json(content: &str) -> Result<EngineConfig, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 根据格式解析配置
pub fn parse(content: &str, format: ConfigFormat) -> Result<EngineConfig, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ConfigFormat::from_extension("TOML"), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_extension("json"), Some(ConfigFormat::Json));
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }

    #[test]
    fn test_parse_partial_toml() {
        let config = parse_toml("[pipeline]\nsingle_threaded = true\n").unwrap();
        assert!(config.pipeline.single_threaded);
        assert_eq!(config.pipeline.max_in_flight, 256);
        assert!(config.collision.compute_zones);
    }

    #[test]
    fn test_parse_json() {
        let config = parse_json(r#"{"collision": {"type_filter": [[2, 3]]}}"#).unwrap();
        assert_eq!(config.collision.type_filter, vec![(2, 3)]);
    }

    #[test]
    fn test_parse_errors_keep_source() {
        let err = parse("[pipeline\n", ConfigFormat::Toml).unwrap_err();
        assert!(err.to_string().contains("TOML parse error"));
        assert!(std::error::Error::source(&err).is_some());

        let err = parse(r#"{"statistics": {"family": "tag99"}}"#, ConfigFormat::Json).unwrap_err();
        assert!(err.to_string().contains("JSON parse error"));
    }
}
