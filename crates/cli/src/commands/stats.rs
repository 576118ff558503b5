//! `stats` command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use contracts::{TagCounter, TagStatistics};
use statistics::{into_tag_list, CacheLookup, StatisticsAggregator};
use tracing::info;

use super::load_config;
use crate::cli::StatsArgs;
use crate::colony::Colony;

/// Execute the `stats` command
pub fn run_stats(args: &StatsArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let cache_dir: Option<PathBuf> = args
        .cache_dir
        .clone()
        .or_else(|| config.statistics.cache_dir.clone());
    let colony = Colony::generate(&args.colony, cache_dir.as_deref())?;

    let Some(tags) = compute(&colony, args.cached_only)? else {
        println!("Tag statistics not computed yet; run without --cached-only");
        return Ok(());
    };

    if args.json {
        let json = serde_json::to_string_pretty(&tags).context("Failed to serialize statistics")?;
        println!("{json}");
    } else {
        print_statistics(&tags);
    }
    Ok(())
}

/// `None` when only cached results were asked for and some are missing.
fn compute(colony: &Colony, cached_only: bool) -> Result<Option<Vec<TagStatistics>>> {
    let aggregator = StatisticsAggregator::default();
    let merged = if cached_only {
        match aggregator
            .cached(&colony.sources)
            .context("Failed to read statistics cache")?
        {
            CacheLookup::Hit(statistics) => statistics,
            CacheLookup::NotComputed => return Ok(None),
        }
    } else {
        aggregator
            .compute(&colony.sources)
            .context("Failed to compute tag statistics")?
    };
    info!(tags = merged.tags.len(), "Tag statistics ready");
    Ok(Some(into_tag_list(merged)))
}

fn print_statistics(tags: &[TagStatistics]) {
    println!("\n=== Tag statistics ({} tags) ===\n", tags.len());
    println!(
        "{:>6} {:>8} {:>8} {:>6} {:>6} {:>6} {:>6} {:>6} {:>6} {:>6}",
        "tag", "seen", "multi", "<1s", "<10s", "<1m", "<10m", "<1h", "<10h", ">10h"
    );
    for stats in tags {
        println!(
            "{:>6} {:>8} {:>8} {:>6} {:>6} {:>6} {:>6} {:>6} {:>6} {:>6}",
            stats.tag.get(),
            stats.count(TagCounter::TotalSeen),
            stats.count(TagCounter::MultipleSeen),
            stats.count(TagCounter::Gap1S),
            stats.count(TagCounter::Gap10S),
            stats.count(TagCounter::Gap1M),
            stats.count(TagCounter::Gap10M),
            stats.count(TagCounter::Gap1H),
            stats.count(TagCounter::Gap10H),
            stats.count(TagCounter::GapMore),
        );
    }
    println!();
}
