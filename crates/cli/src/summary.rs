//! Run summary.

use std::time::Duration;

use query::PipelineReport;

use crate::cli::QueryKind;

/// What a query run produced
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub query: QueryKind,
    pub duration: Duration,
    pub report: PipelineReport,
    /// Frames handed to the sink (identify / collide)
    pub frames: u64,
    pub ant_positions: u64,
    pub collisions: u64,
    pub trajectories: u64,
    pub trajectory_samples: u64,
    pub interactions: u64,
    /// Summed interaction duration, seconds
    pub interaction_secs: f64,
}

impl RunSummary {
    pub fn new(query: QueryKind) -> Self {
        Self {
            query,
            duration: Duration::ZERO,
            report: PipelineReport::default(),
            frames: 0,
            ant_positions: 0,
            collisions: 0,
            trajectories: 0,
            trajectory_samples: 0,
            interactions: 0,
            interaction_secs: 0.0,
        }
    }

    /// Delivered frames per second of wall time
    pub fn fps(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.report.frames_delivered as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    pub fn mean_interaction_secs(&self) -> f64 {
        if self.interactions > 0 {
            self.interaction_secs / self.interactions as f64
        } else {
            0.0
        }
    }

    pub fn print_summary(&self) {
        println!("\n=== {:?} query ===\n", self.query);

        println!("Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Frames loaded: {}", self.report.frames_loaded);
        println!("   ├─ Frames skipped: {}", self.report.frames_skipped);
        println!("   ├─ Frames delivered: {}", self.report.frames_delivered);
        println!("   ├─ FPS: {:.2}", self.fps());
        println!("   └─ Cancelled: {}", self.report.cancelled);

        println!("\nResults");
        match self.query {
            QueryKind::Identify | QueryKind::Collide => {
                println!("   ├─ Frames: {}", self.frames);
                println!("   ├─ Ant positions: {}", self.ant_positions);
                println!("   └─ Collisions: {}", self.collisions);
            }
            QueryKind::Trajectories | QueryKind::Interactions => {
                println!("   ├─ Trajectories: {}", self.trajectories);
                println!("   ├─ Trajectory samples: {}", self.trajectory_samples);
                println!("   ├─ Interactions: {}", self.interactions);
                println!(
                    "   └─ Mean interaction: {:.2}s",
                    self.mean_interaction_secs()
                );
            }
        }

        println!("\n{}", self.report.metrics);
    }
}
