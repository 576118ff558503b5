//! The four query kinds.

use std::collections::HashSet;
use std::sync::Arc;

use contracts::{
    AntInteraction, AntTrajectory, CallbackSink, CollisionFrame, ContractError, EngineConfig,
    FrameSink, FrameSource, IdentifiedFrame, RawFrame, Time,
};
use segmenter::{SegmentedOutput, Segmenter, SegmenterConfig};
use tracing::{debug, instrument};

use crate::cancel::CancellationFlag;
use crate::error::{QueryError, Result};
use crate::matcher::Matcher;
use crate::pipeline::{Pipeline, PipelineOptions, PipelineReport};
use crate::snapshot::QuerySnapshot;

/// Arguments shared by every query.
#[derive(Debug, Clone)]
pub struct QueryArgs {
    /// Inclusive start, `None` from the beginning
    pub start: Option<Time>,
    /// Exclusive end, `None` until the end
    pub end: Option<Time>,
    pub matcher: Matcher,
    pub pipeline: PipelineOptions,
    pub segmenter: SegmenterConfig,
    /// Resolve zones when only identifying
    pub compute_zones: bool,
    pub cancel: CancellationFlag,
}

impl Default for QueryArgs {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl QueryArgs {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            start: None,
            end: None,
            matcher: Matcher::Any,
            pipeline: PipelineOptions::from(&config.pipeline),
            segmenter: SegmenterConfig::from(&config.segmentation),
            compute_zones: config.collision.compute_zones,
            cancel: CancellationFlag::new(),
        }
    }

    fn pipeline(&self, name: &'static str) -> Pipeline {
        Pipeline::new(name, self.pipeline).with_cancellation(self.cancel.clone())
    }
}

/// Removes the ants the matcher rejects.
fn retain_matching_ants(matcher: &Matcher, frame: &mut IdentifiedFrame) {
    if matcher.is_any() {
        return;
    }
    let keep: HashSet<_> = frame
        .positions
        .iter()
        .filter(|p| matcher.matches(frame, p.ant, None, &[]))
        .map(|p| p.ant)
        .collect();
    frame.positions.retain(|p| keep.contains(&p.ant));
}

/// Removes the collisions the matcher rejects.
fn retain_matching_pairs(matcher: &Matcher, frame: &IdentifiedFrame, collisions: &mut CollisionFrame) {
    if matcher.is_any() {
        return;
    }
    collisions
        .collisions
        .retain(|c| matcher.matches(frame, c.ants.0, Some(c.ants.1), &c.types));
}

/// Runs queries over a set of sources with one snapshot.
#[derive(Clone)]
pub struct QueryEngine {
    sources: Vec<Arc<dyn FrameSource>>,
    snapshot: QuerySnapshot,
}

impl QueryEngine {
    pub fn new(sources: Vec<Arc<dyn FrameSource>>, snapshot: QuerySnapshot) -> Self {
        Self { sources, snapshot }
    }

    pub fn sources(&self) -> &[Arc<dyn FrameSource>] {
        &self.sources
    }

    pub fn snapshot(&self) -> &QuerySnapshot {
        &self.snapshot
    }

    /// Identified frames in time order.
    #[instrument(name = "query_identify_frames", skip_all)]
    pub async fn identify_frames(
        &self,
        args: &QueryArgs,
        sink: &mut dyn FrameSink<IdentifiedFrame>,
    ) -> Result<PipelineReport> {
        let snapshot = self.snapshot.clone();
        let matcher = args.matcher.clone();
        let zones = args.compute_zones;
        let compute = move |frame: RawFrame| {
            let mut identified = snapshot.identify(&frame, zones);
            retain_matching_ants(&matcher, &mut identified);
            identified
        };
        args.pipeline("identify_frames")
            .run(&self.sources, args.start, args.end, compute, sink)
            .await
    }

    /// Identified frames with their collisions, in time order.
    ///
    /// The matcher prunes collisions only.
    #[instrument(name = "query_collide_frames", skip_all)]
    pub async fn collide_frames(
        &self,
        args: &QueryArgs,
        sink: &mut dyn FrameSink<(IdentifiedFrame, CollisionFrame)>,
    ) -> Result<PipelineReport> {
        let snapshot = self.snapshot.clone();
        let matcher = args.matcher.clone();
        let compute = move |frame: RawFrame| {
            let (identified, mut collisions) = snapshot.collide(&frame);
            retain_matching_pairs(&matcher, &identified, &mut collisions);
            (identified, collisions)
        };
        args.pipeline("collide_frames")
            .run(&self.sources, args.start, args.end, compute, sink)
            .await
    }

    /// Trajectories of every ant the matcher accepts.
    #[instrument(name = "query_compute_trajectories", skip_all)]
    pub async fn compute_trajectories(
        &self,
        args: &QueryArgs,
        trajectories: &mut dyn FrameSink<AntTrajectory>,
    ) -> Result<PipelineReport> {
        self.segment("compute_trajectories", args, trajectories, None)
            .await
    }

    /// Interactions, and the trajectories they refer to.
    #[instrument(name = "query_compute_interactions", skip_all)]
    pub async fn compute_interactions(
        &self,
        args: &QueryArgs,
        trajectories: &mut dyn FrameSink<AntTrajectory>,
        interactions: &mut dyn FrameSink<AntInteraction>,
    ) -> Result<PipelineReport> {
        self.segment("compute_interactions", args, trajectories, Some(interactions))
            .await
    }

    async fn segment<'t, 'i>(
        &self,
        name: &'static str,
        args: &QueryArgs,
        trajectories: &mut (dyn FrameSink<AntTrajectory> + 't),
        mut interactions: Option<&mut (dyn FrameSink<AntInteraction> + 'i)>,
    ) -> Result<PipelineReport> {
        let snapshot = self.snapshot.clone();
        let matcher = args.matcher.clone();
        let with_collisions = interactions.is_some();
        let zones = args.compute_zones;
        let compute = move |frame: RawFrame| {
            if !with_collisions {
                let mut identified = snapshot.identify(&frame, zones);
                retain_matching_ants(&matcher, &mut identified);
                return (identified, None);
            }
            let (mut identified, mut collisions) = snapshot.collide(&frame);
            retain_matching_pairs(&matcher, &identified, &mut collisions);
            retain_matching_ants(&matcher, &mut identified);
            (identified, Some(collisions))
        };

        let mut segmenter = Segmenter::new(args.segmenter);
        let report = {
            let mut consume = CallbackSink::new(
                "segmenter",
                |(frame, collisions): (IdentifiedFrame, Option<CollisionFrame>)| {
                    let out = segmenter.push(&frame, collisions.as_ref());
                    emit(out, &mut *trajectories, interactions.as_mut().map(|s| &mut **s))
                },
            );
            args.pipeline(name)
                .run(&self.sources, args.start, args.end, compute, &mut consume)
                .await?
        };

        let rest = segmenter.flush();
        debug!(
            trajectories = rest.trajectories.len(),
            interactions = rest.interactions.len(),
            "Emitting still open results"
        );
        emit(rest, &mut *trajectories, interactions.as_mut().map(|s| &mut **s))
            .map_err(|e| QueryError::sink("segmenter", e))?;

        trajectories
            .finish()
            .map_err(|e| QueryError::sink(trajectories.name(), e))?;
        if let Some(sink) = interactions {
            sink.finish().map_err(|e| QueryError::sink(sink.name(), e))?;
        }
        Ok(report)
    }
}

fn emit<'t, 'i>(
    out: SegmentedOutput,
    trajectories: &mut (dyn FrameSink<AntTrajectory> + 't),
    interactions: Option<&mut (dyn FrameSink<AntInteraction> + 'i)>,
) -> std::result::Result<(), ContractError> {
    for trajectory in out.trajectories {
        trajectories.consume(trajectory)?;
    }
    if let Some(sink) = interactions {
        for interaction in out.interactions {
            sink.consume(interaction)?;
        }
    }
    Ok(())
}
