//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::EngineConfig;
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{json}");
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: Vec::new(),
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => ValidationResult {
            valid: true,
            config_path,
            error: None,
            warnings: collect_warnings(&config),
        },
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: Vec::new(),
        },
    }
}

/// Non-fatal issues
fn collect_warnings(config: &EngineConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.pipeline.channel_capacity > config.pipeline.max_in_flight {
        warnings.push(format!(
            "pipeline.channel_capacity ({}) exceeds max_in_flight ({}); the extra capacity is never used",
            config.pipeline.channel_capacity, config.pipeline.max_in_flight
        ));
    }
    if config.pipeline.single_threaded && config.pipeline.workers > 0 {
        warnings.push("pipeline.workers is ignored when single_threaded is set".to_string());
    }
    if config.segmentation.max_gap_ms < 100 {
        warnings.push(format!(
            "segmentation.max_gap_ms = {} is below a typical frame period; trajectories will be fragmented",
            config.segmentation.max_gap_ms
        ));
    }
    if config.statistics.cache_dir.is_none() {
        warnings.push("statistics.cache_dir is not set - in-memory sources will not be cached".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if !result.warnings.is_empty() {
            println!("\n⚠ Warnings:");
            for warning in &result.warnings {
                println!("  - {warning}");
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {error}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn args_for(content: &str) -> (tempfile::NamedTempFile, ValidateArgs) {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        let args = ValidateArgs {
            config: file.path().to_path_buf(),
            json: true,
        };
        (file, args)
    }

    #[test]
    fn test_valid_file() {
        let (_file, args) = args_for("[statistics]\ncache_dir = \"/tmp/cache\"\n");
        let result = validate_config(&args);
        assert!(result.valid);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_invalid_file() {
        let (_file, args) = args_for("[pipeline]\nmax_in_flight = 0\n");
        let result = validate_config(&args);
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("max_in_flight"));
        assert!(run_validate(&args).is_err());
    }

    #[test]
    fn test_missing_file() {
        let args = ValidateArgs {
            config: "/nonexistent/colony.toml".into(),
            json: false,
        };
        assert!(!validate_config(&args).valid);
    }

    #[test]
    fn test_warnings() {
        let mut config = EngineConfig::default();
        config.pipeline.channel_capacity = 1_000;
        config.segmentation.max_gap_ms = 10;
        assert_eq!(collect_warnings(&config).len(), 3);
    }
}
