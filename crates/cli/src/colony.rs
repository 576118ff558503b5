//! Synthetic colony setup shared by `run` and `stats`.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use collision::{AntShapes, TypeFilter, ZoneRegistry};
use contracts::{AntId, EngineConfig, FrameSource, SpaceId, Time};
use geometry::{Capsule, Vec2};
use identification::MutableIdentifier;
use ingestion::{SyntheticColony, SyntheticColonyConfig};
use query::QuerySnapshot;
use tracing::{debug, info};

use crate::cli::ColonyArgs;

/// Body part type of the single capsule given to every ant
pub const BODY_PART: u32 = 1;

/// Generated spaces and the ants living in them.
pub struct Colony {
    pub sources: Vec<Arc<dyn FrameSource>>,
    pub ants: Vec<(AntId, contracts::TagId)>,
    pub start: Time,
}

impl Colony {
    /// Generates one colony per space. Caches go to `cache_dir` when given.
    pub fn generate(args: &ColonyArgs, cache_dir: Option<&Path>) -> Result<Self> {
        if args.spaces == 0 {
            anyhow::bail!("at least one space is required");
        }
        let mut sources: Vec<Arc<dyn FrameSource>> = Vec::with_capacity(args.spaces as usize);
        let mut ants = Vec::new();
        let mut start = Time::from_unix_nanos(0);

        for space in 1..=args.spaces {
            let colony = SyntheticColony::new(SyntheticColonyConfig {
                space: SpaceId(space),
                ants: args.ants,
                frames: args.frames,
                frame_rate_hz: args.frame_rate,
                detection_rate: args.detection_rate,
                malformed_every: args.malformed_every,
                seed: args.seed.wrapping_add(space as u64),
                ..Default::default()
            })
            .with_context(|| format!("Invalid synthetic colony for space {space}"))?;
            ants = colony.ants();
            start = colony.config().start;

            let mut source = colony
                .generate()
                .with_context(|| format!("Failed to generate space {space}"))?
                .with_segment_frames(args.segment_frames);
            if let Some(dir) = cache_dir {
                source = source.with_cache_dir(dir.join(format!("space{space}")));
            }
            debug!(space, frames = source.len(), "Space generated");
            sources.push(Arc::new(source));
        }

        info!(
            spaces = args.spaces,
            ants = args.ants,
            frames = args.frames,
            "Synthetic colony ready"
        );
        Ok(Self {
            sources,
            ants,
            start,
        })
    }

    /// Identifies every ant by its tag for the whole experiment and gives it a
    /// round body capsule.
    pub fn snapshot(&self, config: &EngineConfig, capsule_radius: f64) -> Result<QuerySnapshot> {
        let mut identifier = MutableIdentifier::new();
        let mut shapes = AntShapes::new();
        for &(ant, tag) in &self.ants {
            identifier
                .add_identification(ant, tag, None, None)
                .with_context(|| format!("Failed to identify ant {ant}"))?;
            shapes.add_capsule(
                ant,
                BODY_PART,
                Capsule::new(
                    Vec2::new(-capsule_radius / 2.0, 0.0),
                    Vec2::new(capsule_radius / 2.0, 0.0),
                    capsule_radius,
                    capsule_radius,
                ),
            );
        }
        Ok(QuerySnapshot::compile(
            &identifier,
            &ZoneRegistry::new(),
            shapes,
            TypeFilter::new(config.collision.type_filter.iter().copied()),
        ))
    }
}
