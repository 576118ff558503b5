//! # Colony Query CLI
//!
//! 命令行接口入口点。
//!
//! 提供：
//! - 配置加载与验证
//! - 合成蚁群上的四类查询
//! - 标签统计 (带缓存)

mod cli;
mod colony;
mod commands;
mod summary;

use anyhow::{Context, Result};
use clap::Parser;
use observability::ObservabilityConfig;
use tracing::info;

use cli::{Cli, Commands};
use commands::{run_info, run_query, run_stats, run_validate};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(&cli)?;

    info!(version = env!("CARGO_PKG_VERSION"), "Colony query CLI starting");

    let result = match cli.command {
        Commands::Run(args) => run_query(&args).await,
        Commands::Stats(args) => tokio::task::spawn_blocking(move || run_stats(&args))
            .await
            .context("Statistics task panicked")
            .and_then(|r| r),
        Commands::Validate(args) => run_validate(&args),
        Commands::Info(args) => run_info(&args),
    };

    if let Err(ref e) = result {
        tracing::error!(error = %e, "Command failed");
    }

    result
}

/// Initialize logging based on CLI options
fn init_logging(cli: &Cli) -> Result<()> {
    let level = if cli.quiet {
        "warn"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    observability::init_with_config(ObservabilityConfig {
        log_format: cli.log_format.into(),
        metrics_port: None,
        default_log_level: level.to_string(),
    })
}
