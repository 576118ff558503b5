//! `info` command implementation.

use anyhow::{Context, Result};
use config_loader::ConfigLoader;
use contracts::EngineConfig;

use super::load_config;
use crate::cli::InfoArgs;

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;

    if args.json {
        println!("{}", ConfigLoader::to_json(&config).context("Failed to serialize config")?);
    } else if args.toml {
        println!("{}", ConfigLoader::to_toml(&config).context("Failed to serialize config")?);
    } else {
        print_config_info(&config);
    }
    Ok(())
}

fn print_config_info(config: &EngineConfig) {
    println!("=== Colony Query Configuration ===\n");

    let pipeline = &config.pipeline;
    println!("Pipeline");
    if pipeline.single_threaded {
        println!("   ├─ Mode: single-threaded");
    } else {
        println!(
            "   ├─ Workers: {} (configured {})",
            pipeline.effective_workers(),
            pipeline.workers
        );
    }
    println!("   ├─ Max in flight: {}", pipeline.max_in_flight);
    println!("   └─ Channel capacity: {}", pipeline.channel_capacity);

    println!("\nSegmentation");
    println!("   ├─ Max gap: {}", config.segmentation.max_gap());
    println!(
        "   └─ Summarize segments: {}",
        config.segmentation.summarize_segments
    );

    println!("\nCollision");
    if config.collision.type_filter.is_empty() {
        println!("   ├─ Type filter: every pair");
    } else {
        println!("   ├─ Type filter: {:?}", config.collision.type_filter);
    }
    println!("   └─ Compute zones: {}", config.collision.compute_zones);

    let statistics = &config.statistics;
    println!("\nStatistics");
    match &statistics.cache_dir {
        Some(dir) => println!("   ├─ Cache: {}", dir.display()),
        None => println!("   ├─ Cache: next to each segment"),
    }
    println!(
        "   └─ Detection: {} (threshold {})",
        statistics.family, statistics.threshold
    );

    let observability = &config.observability;
    println!("\nObservability");
    println!("   ├─ Log: {} ({:?})", observability.log_level, observability.log_format);
    match observability.metrics_port {
        Some(port) => println!("   └─ Metrics: port {port}"),
        None => println!("   └─ Metrics: disabled"),
    }

    println!();
}
