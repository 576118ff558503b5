//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 两只蚂蚁 1000 帧端到端场景
//! - 多空间流水线顺序
//! - 重放幂等性
//! - 统计与缓存的端到端校验

#[cfg(test)]
mod fixtures {
    use std::sync::Arc;

    use collision::{AntShapes, TypeFilter, ZoneRegistry};
    use contracts::{AntId, FrameId, FrameSource, RawFrame, SpaceId, TagDetection, TagId, Time};
    use geometry::{Capsule, Vec2};
    use identification::MutableIdentifier;
    use ingestion::MemoryFrameSource;
    use query::{QueryEngine, QuerySnapshot};

    pub const PERIOD_MS: i64 = 10;

    pub fn time_of(frame: u64) -> Time {
        Time::from_unix_nanos(1_000_000_000 + frame as i64 * PERIOD_MS * 1_000_000)
    }

    /// Two ants over 1000 frames at 100Hz. Ant 1 stays at the origin, ant 2
    /// sits 100px away except during frames 400..=450 where it touches ant 1.
    /// `hidden` frames miss ant 2's detection.
    pub fn two_ants(hidden: impl Fn(u64) -> bool) -> MemoryFrameSource {
        let mut source = MemoryFrameSource::new(SpaceId(1)).with_segment_frames(128);
        for i in 0..1000u64 {
            let mut frame = RawFrame::new(FrameId(i), time_of(i), SpaceId(1));
            frame.tags.push(TagDetection {
                tag: TagId(0),
                x: 0.0,
                y: 0.0,
                angle: 0.0,
            });
            if !hidden(i) {
                let x = if (400..=450).contains(&i) { 15.0 } else { 100.0 };
                frame.tags.push(TagDetection {
                    tag: TagId(1),
                    x,
                    y: 0.0,
                    angle: 0.0,
                });
            }
            source.push(frame).unwrap();
        }
        source
    }

    /// Ants `1..=ants` wear tags `0..ants`, each with a radius 10 capsule.
    pub fn snapshot(ants: u32) -> QuerySnapshot {
        let mut identifier = MutableIdentifier::new();
        let mut shapes = AntShapes::new();
        for ant in 1..=ants {
            identifier
                .add_identification(AntId(ant), TagId(ant - 1), None, None)
                .unwrap();
            shapes.add_capsule(
                AntId(ant),
                1,
                Capsule::new(Vec2::new(-5.0, 0.0), Vec2::new(5.0, 0.0), 10.0, 10.0),
            );
        }
        QuerySnapshot::compile(&identifier, &ZoneRegistry::new(), shapes, TypeFilter::default())
    }

    pub fn engine(sources: Vec<Arc<dyn FrameSource>>, ants: u32) -> QueryEngine {
        QueryEngine::new(sources, snapshot(ants))
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::Arc;

    use contracts::{AntId, Duration, VecSink};
    use query::{PipelineOptions, QueryArgs};
    use segmenter::SegmenterConfig;

    use crate::fixtures::{engine, time_of, two_ants};

    fn args() -> QueryArgs {
        QueryArgs {
            pipeline: PipelineOptions {
                workers: 4,
                max_in_flight: 64,
                channel_capacity: 16,
                single_threaded: false,
            },
            segmenter: SegmenterConfig {
                max_gap: Duration::from_millis(220),
                summarize: false,
            },
            ..QueryArgs::default()
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_two_ants_single_interaction() {
        let engine = engine(vec![Arc::new(two_ants(|_| false))], 2);
        let mut trajectories = VecSink::new();
        let mut interactions = VecSink::new();
        let report = engine
            .compute_interactions(&args(), &mut trajectories, &mut interactions)
            .await
            .unwrap();
        assert_eq!(report.frames_delivered, 1000);
        assert_eq!(report.frames_skipped, 0);

        assert_eq!(interactions.items.len(), 1);
        let interaction = &interactions.items[0];
        assert_eq!(interaction.ants, (AntId(1), AntId(2)));
        assert_eq!(interaction.types, vec![(1, 1)]);
        assert_eq!(interaction.segments.0.begin, 400);
        assert_eq!(interaction.segments.0.end, 451);
        assert_eq!(interaction.segments.1.begin, 400);
        assert_eq!(interaction.segments.1.end, 451);
        assert_eq!(interaction.start, time_of(400));
        assert_eq!(interaction.end, time_of(450));

        let mut trajectories = trajectories.items;
        trajectories.sort_by_key(|t| t.ant);
        assert_eq!(trajectories.len(), 2);
        assert_eq!(trajectories[0].ant, AntId(1));
        assert_eq!(trajectories[1].ant, AntId(2));
        assert!(trajectories.iter().all(|t| t.len() == 1000 && t.start == time_of(0)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_gap_splits_trajectory_only_when_too_long() {
        // 200ms of missing detections stays inside the 220ms budget, 300ms
        // does not.
        let short = two_ants(|i| (100..119).contains(&i));
        let long = two_ants(|i| (600..629).contains(&i));
        let engine = engine(vec![Arc::new(short)], 2);
        let mut trajectories = VecSink::new();
        engine.compute_trajectories(&args(), &mut trajectories).await.unwrap();
        assert_eq!(trajectories.items.len(), 2);

        let engine = crate::fixtures::engine(vec![Arc::new(long)], 2);
        let mut trajectories = VecSink::new();
        engine.compute_trajectories(&args(), &mut trajectories).await.unwrap();
        let mut ant2: Vec<_> = trajectories
            .items
            .iter()
            .filter(|t| t.ant == AntId(2))
            .map(|t| (t.start, t.len()))
            .collect();
        ant2.sort();
        assert_eq!(ant2, vec![(time_of(0), 600), (time_of(629), 371)]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_collide_frames_pair_range() {
        let engine = engine(vec![Arc::new(two_ants(|_| false))], 2);
        let mut sink = VecSink::new();
        engine.collide_frames(&args(), &mut sink).await.unwrap();
        let touching: Vec<u64> = sink
            .items
            .iter()
            .filter(|(_, c)| !c.collisions.is_empty())
            .map(|(f, _)| f.frame_id.get())
            .collect();
        assert_eq!(touching, (400..=450).collect::<Vec<_>>());
    }
}

#[cfg(test)]
mod pipeline_tests {
    use std::sync::Arc;

    use contracts::{FrameSource, IdentifiedFrame, SpaceId, VecSink};
    use ingestion::{SyntheticColony, SyntheticColonyConfig};
    use query::{PipelineOptions, QueryArgs};

    use crate::fixtures::engine;

    fn spaces() -> Vec<Arc<dyn FrameSource>> {
        (1..=3)
            .map(|space| {
                let source = SyntheticColony::new(SyntheticColonyConfig {
                    space: SpaceId(space),
                    ants: 6,
                    frames: 300,
                    // Distinct rates interleave the spaces.
                    frame_rate_hz: 7.0 + space as f64,
                    detection_rate: 0.8,
                    malformed_every: Some(37),
                    seed: space as u64,
                    ..Default::default()
                })
                .unwrap()
                .generate()
                .unwrap()
                .with_segment_frames(50);
                Arc::new(source) as Arc<dyn FrameSource>
            })
            .collect()
    }

    async fn identify(options: PipelineOptions) -> (u64, Vec<IdentifiedFrame>) {
        let engine = engine(spaces(), 6);
        let args = QueryArgs {
            pipeline: options,
            ..QueryArgs::default()
        };
        let mut sink = VecSink::new();
        let report = engine.identify_frames(&args, &mut sink).await.unwrap();
        (report.frames_skipped, sink.items)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_parallel_matches_serial_across_spaces() {
        let (serial_skipped, serial) = identify(PipelineOptions::serial()).await;
        let (skipped, parallel) = identify(PipelineOptions {
            workers: 8,
            max_in_flight: 16,
            channel_capacity: 4,
            single_threaded: false,
        })
        .await;

        // 300 frames per space, every 37th malformed.
        assert_eq!(serial_skipped, 3 * 8);
        assert_eq!(skipped, serial_skipped);
        assert_eq!(serial.len(), 3 * (300 - 8));
        assert_eq!(parallel, serial);
        assert!(parallel
            .windows(2)
            .all(|w| (w[0].time, w[0].space, w[0].frame_id) <= (w[1].time, w[1].space, w[1].frame_id)));
    }
}

#[cfg(test)]
mod replay_tests {
    use std::sync::Arc;

    use contracts::{AntInteraction, AntTrajectory, Duration, VecSink};
    use query::{PipelineOptions, QueryArgs};
    use segmenter::{Segmenter, SegmenterConfig};

    use crate::fixtures::{engine, snapshot, two_ants};

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_interactions_are_identical_across_runs() {
        let engine = engine(
            vec![Arc::new(two_ants(|i| i % 97 == 0 || (700..730).contains(&i)))],
            2,
        );
        let mut runs: Vec<(Vec<AntTrajectory>, Vec<AntInteraction>)> = Vec::new();
        for workers in [1, 3, 8] {
            let args = QueryArgs {
                pipeline: PipelineOptions {
                    workers,
                    max_in_flight: 32,
                    channel_capacity: 8,
                    single_threaded: false,
                },
                segmenter: SegmenterConfig {
                    max_gap: Duration::from_millis(220),
                    summarize: false,
                },
                ..QueryArgs::default()
            };
            let mut trajectories = VecSink::new();
            let mut interactions = VecSink::new();
            engine
                .compute_interactions(&args, &mut trajectories, &mut interactions)
                .await
                .unwrap();
            runs.push((trajectories.items, interactions.items));
        }
        assert_eq!(runs[0].1.len(), 1);
        assert!(runs.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn test_segmenter_replay_is_idempotent() {
        use contracts::FrameSource;

        let source = two_ants(|i| (300..330).contains(&i));
        let snapshot = snapshot(2);
        let config = SegmenterConfig {
            max_gap: Duration::from_millis(220),
            summarize: true,
        };
        let replay = || {
            let mut segmenter = Segmenter::new(config);
            let mut out = segmenter::SegmentedOutput::default();
            for frame in source.seek_time(None) {
                let (identified, collisions) = snapshot.collide(&frame.unwrap());
                out.extend(segmenter.push(&identified, Some(&collisions)));
            }
            out.extend(segmenter.flush());
            out
        };
        let first = replay();
        let second = replay();
        assert_eq!(first.trajectories, second.trajectories);
        assert_eq!(first.interactions, second.interactions);
        assert_eq!(first.trajectories.len(), 3);
        assert_eq!(first.interactions.len(), 1);
    }
}

#[cfg(test)]
mod statistics_tests {
    use std::sync::Arc;

    use contracts::{FrameSource, TagCounter, TagId};
    use statistics::{into_tag_list, CacheLookup, StatisticsAggregator};

    use crate::fixtures::two_ants;

    #[test]
    fn test_tag_statistics_with_cache() {
        let dir = tempfile::tempdir().unwrap();
        // Ant 2 hidden for 1.5s: frames 199 and 350 are 1.51s apart.
        let source: Arc<dyn FrameSource> =
            Arc::new(two_ants(|i| (200..350).contains(&i)).with_cache_dir(dir.path()));
        let sources = vec![source];
        let aggregator = StatisticsAggregator::default();
        assert_eq!(aggregator.cached(&sources).unwrap(), CacheLookup::NotComputed);

        let merged = aggregator.compute(&sources).unwrap();
        let tags = into_tag_list(merged.clone());
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].tag, TagId(0));
        assert_eq!(tags[0].count(TagCounter::TotalSeen), 1000);
        assert_eq!(tags[0].total_gaps(), 0);
        assert_eq!(tags[1].count(TagCounter::TotalSeen), 850);
        assert_eq!(tags[1].count(TagCounter::Gap10S), 1);
        assert_eq!(tags[1].total_gaps(), 1);

        assert_eq!(aggregator.cached(&sources).unwrap(), CacheLookup::Hit(merged));
    }
}

#[cfg(test)]
mod config_tests {
    use config_loader::{ConfigFormat, ConfigLoader};
    use query::QueryArgs;

    #[test]
    fn test_config_drives_query_args() {
        let config = ConfigLoader::load_from_str(
            r#"
[pipeline]
workers = 3
single_threaded = true

[segmentation]
max_gap_ms = 220
summarize_segments = true
"#,
            ConfigFormat::Toml,
        )
        .unwrap();
        let args = QueryArgs::from_config(&config);
        assert_eq!(args.pipeline.workers, 3);
        assert!(args.pipeline.single_threaded);
        assert_eq!(args.segmenter.max_gap, contracts::Duration::from_millis(220));
        assert!(args.segmenter.summarize);
    }
}
