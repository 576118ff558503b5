//! `run` command implementation.

use std::time::Instant;

use anyhow::{Context, Result};
use config_loader::ConfigLoader;
use contracts::{
    AntId, AntInteraction, AntTrajectory, CallbackSink, CollisionFrame, ContractError, Duration,
    EngineConfig, IdentifiedFrame,
};
use query::{Matcher, QueryArgs, QueryEngine};
use tracing::{info, warn};

use super::load_config;
use crate::cli::{QueryKind, RunArgs};
use crate::colony::Colony;
use crate::summary::RunSummary;

type SinkResult = std::result::Result<(), ContractError>;

/// Execute the `run` command
pub async fn run_query(args: &RunArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    apply_overrides(&mut config, args);
    ConfigLoader::validate(&config).context("Invalid configuration after CLI overrides")?;

    if let Some(port) = args.metrics_port.or(config.observability.metrics_port) {
        observability::init_metrics_only(port)?;
    }

    let colony = Colony::generate(&args.colony, None)?;
    let snapshot = colony.snapshot(&config, args.colony.capsule_radius)?;
    let engine = QueryEngine::new(colony.sources.clone(), snapshot);
    let query_args = build_query_args(&config, args, &colony);

    // Ctrl+C cancels the query; results delivered so far are kept.
    let cancel = query_args.cancel.clone();
    let signal = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Received shutdown signal, cancelling query...");
            cancel.cancel();
        }
    });

    info!(query = ?args.query, "Starting query...");
    let started = Instant::now();
    let result = execute(&engine, &query_args, args.query).await;
    signal.abort();

    let mut summary = result.context("Query failed")?;
    summary.duration = started.elapsed();
    info!(
        frames_delivered = summary.report.frames_delivered,
        frames_skipped = summary.report.frames_skipped,
        duration_secs = summary.duration.as_secs_f64(),
        fps = format!("{:.2}", summary.fps()),
        "Query completed"
    );
    summary.print_summary();
    Ok(())
}

fn apply_overrides(config: &mut EngineConfig, args: &RunArgs) {
    if let Some(workers) = args.workers {
        info!(workers, "Overriding pipeline workers from CLI");
        config.pipeline.workers = workers;
    }
    if args.single_threaded {
        config.pipeline.single_threaded = true;
    }
    if let Some(max_gap_ms) = args.max_gap_ms {
        info!(max_gap_ms, "Overriding segmentation gap from CLI");
        config.segmentation.max_gap_ms = max_gap_ms;
    }
}

fn build_query_args(config: &EngineConfig, args: &RunArgs, colony: &Colony) -> QueryArgs {
    let mut query_args = QueryArgs::from_config(config);
    if !args.ant_filter.is_empty() {
        query_args.matcher = Matcher::or(args.ant_filter.iter().map(|&id| Matcher::AntId(AntId(id))));
    }
    query_args.start = args
        .from_secs
        .map(|s| colony.start.add(Duration::from_secs_f64(s)));
    query_args.end = args
        .to_secs
        .map(|s| colony.start.add(Duration::from_secs_f64(s)));
    query_args
}

async fn execute(engine: &QueryEngine, args: &QueryArgs, kind: QueryKind) -> query::Result<RunSummary> {
    let mut summary = RunSummary::new(kind);
    summary.report = match kind {
        QueryKind::Identify => {
            let mut sink = CallbackSink::new("identify_summary", |frame: IdentifiedFrame| -> SinkResult {
                summary.frames += 1;
                summary.ant_positions += frame.positions.len() as u64;
                Ok(())
            });
            engine.identify_frames(args, &mut sink).await?
        }
        QueryKind::Collide => {
            let mut sink = CallbackSink::new(
                "collide_summary",
                |(frame, collisions): (IdentifiedFrame, CollisionFrame)| -> SinkResult {
                    summary.frames += 1;
                    summary.ant_positions += frame.positions.len() as u64;
                    summary.collisions += collisions.collisions.len() as u64;
                    Ok(())
                },
            );
            engine.collide_frames(args, &mut sink).await?
        }
        QueryKind::Trajectories => {
            let mut sink = CallbackSink::new("trajectory_summary", |t: AntTrajectory| -> SinkResult {
                summary.trajectories += 1;
                summary.trajectory_samples += t.len() as u64;
                Ok(())
            });
            engine.compute_trajectories(args, &mut sink).await?
        }
        QueryKind::Interactions => {
            let mut trajectories = 0u64;
            let mut samples = 0u64;
            let mut interactions = 0u64;
            let mut interaction_secs = 0.0;
            let report = {
                let mut trajectory_sink = CallbackSink::new("trajectory_summary", |t: AntTrajectory| -> SinkResult {
                    trajectories += 1;
                    samples += t.len() as u64;
                    Ok(())
                });
                let mut interaction_sink =
                    CallbackSink::new("interaction_summary", |i: AntInteraction| -> SinkResult {
                        interactions += 1;
                        interaction_secs += i.duration().as_secs_f64();
                        Ok(())
                    });
                engine
                    .compute_interactions(args, &mut trajectory_sink, &mut interaction_sink)
                    .await?
            };
            summary.trajectories = trajectories;
            summary.trajectory_samples = samples;
            summary.interactions = interactions;
            summary.interaction_secs = interaction_secs;
            report
        }
    };
    Ok(summary)
}
