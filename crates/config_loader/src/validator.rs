//! 配置校验模块
//!
//! 校验规则：
//! - max_in_flight > 0, channel_capacity > 0
//! - max_gap_ms > 0
//! - type_filter 无重复 (无序对)
//! - log_level 非空, metrics_port != 0

use std::collections::HashSet;

use contracts::{ContractError, EngineConfig};

/// 校验 EngineConfig
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(config: &EngineConfig) -> Result<(), ContractError> {
    validate_pipeline(config)?;
    validate_segmentation(config)?;
    validate_type_filter(config)?;
    validate_observability(config)?;
    Ok(())
}

fn validate_pipeline(config: &EngineConfig) -> Result<(), ContractError> {
    let pipeline = &config.pipeline;
    if pipeline.max_in_flight == 0 {
        return Err(ContractError::config_validation(
            "pipeline.max_in_flight",
            "must be > 0",
        ));
    }
    if pipeline.channel_capacity == 0 {
        return Err(ContractError::config_validation(
            "pipeline.channel_capacity",
            "must be > 0",
        ));
    }
    Ok(())
}

fn validate_segmentation(config: &EngineConfig) -> Result<(), ContractError> {
    if config.segmentation.max_gap_ms == 0 {
        return Err(ContractError::config_validation(
            "segmentation.max_gap_ms",
            "must be > 0",
        ));
    }
    // Durations are signed nanoseconds.
    if config.segmentation.max_gap_ms > i64::MAX as u64 / 1_000_000 {
        return Err(ContractError::config_validation(
            "segmentation.max_gap_ms",
            format!("{} is out of range", config.segmentation.max_gap_ms),
        ));
    }
    Ok(())
}

/// (a, b) 与 (b, a) 视为同一对
fn validate_type_filter(config: &EngineConfig) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for &(a, b) in &config.collision.type_filter {
        if !seen.insert((a.min(b), a.max(b))) {
            return Err(ContractError::config_validation(
                format!("collision.type_filter[({a}, {b})]"),
                "duplicate body part pair",
            ));
        }
    }
    Ok(())
}

fn validate_observability(config: &EngineConfig) -> Result<(), ContractError> {
    let observability = &config.observability;
    if observability.log_level.trim().is_empty() {
        return Err(ContractError::config_validation(
            "observability.log_level",
            "must not be empty",
        ));
    }
    if observability.metrics_port == Some(0) {
        return Err(ContractError::config_validation(
            "observability.metrics_port",
            "must not be 0",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(validate(&EngineConfig::default()).is_ok());
    }

    #[test]
    fn test_zero_in_flight() {
        let mut config = EngineConfig::default();
        config.pipeline.max_in_flight = 0;
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("max_in_flight"));
    }

    #[test]
    fn test_zero_channel_capacity() {
        let mut config = EngineConfig::default();
        config.pipeline.channel_capacity = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_max_gap_range() {
        let mut config = EngineConfig::default();
        config.segmentation.max_gap_ms = 0;
        assert!(validate(&config).is_err());
        config.segmentation.max_gap_ms = u64::MAX;
        assert!(validate(&config).is_err());
        config.segmentation.max_gap_ms = 220;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_duplicate_type_pair_either_order() {
        let mut config = EngineConfig::default();
        config.collision.type_filter = vec![(1, 2), (1, 1), (2, 1)];
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_observability() {
        let mut config = EngineConfig::default();
        config.observability.log_level = " ".to_string();
        assert!(validate(&config).is_err());

        let mut config = EngineConfig::default();
        config.observability.metrics_port = Some(0);
        assert!(validate(&config).is_err());
    }
}
