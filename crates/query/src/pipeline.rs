//! Load -> Compute -> Consume pipeline shared by every query kind.
//!
//! Load merges the sources in time order on a blocking thread and numbers
//! each frame. Compute workers pull numbered frames from a bounded MPMC
//! channel. Consume, running in the caller's task, puts results back in load
//! order before handing them to the sink. A semaphore bounds the frames
//! between load and delivery.

use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use async_channel::{Receiver, Sender};
use contracts::{
    CollisionFrame, FrameSink, FrameSource, IdentifiedFrame, PipelineConfig, RawFrame, Time,
};
use ingestion::{IngestionMetrics, MergedFrameStream};
use observability::{MetricsSummary, QueryMetricsAggregator};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::cancel::CancellationFlag;
use crate::error::{QueryError, Result};

/// Result of one frame's computation.
pub trait FrameOutput: Send + 'static {
    /// Ants identified in the frame
    fn ant_count(&self) -> usize;

    /// Collisions found in the frame, when computed
    fn collision_count(&self) -> Option<usize> {
        None
    }
}

impl FrameOutput for IdentifiedFrame {
    fn ant_count(&self) -> usize {
        self.positions.len()
    }
}

impl FrameOutput for (IdentifiedFrame, CollisionFrame) {
    fn ant_count(&self) -> usize {
        self.0.positions.len()
    }

    fn collision_count(&self) -> Option<usize> {
        Some(self.1.collisions.len())
    }
}

impl FrameOutput for (IdentifiedFrame, Option<CollisionFrame>) {
    fn ant_count(&self) -> usize {
        self.0.positions.len()
    }

    fn collision_count(&self) -> Option<usize> {
        self.1.as_ref().map(|c| c.collisions.len())
    }
}

/// Pipeline tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    pub workers: usize,
    pub max_in_flight: usize,
    pub channel_capacity: usize,
    /// Run every stage in the calling task
    pub single_threaded: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self::from(&PipelineConfig::default())
    }
}

impl From<&PipelineConfig> for PipelineOptions {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            workers: config.effective_workers().max(1),
            max_in_flight: config.max_in_flight.max(1),
            channel_capacity: config.channel_capacity.max(1),
            single_threaded: config.single_threaded,
        }
    }
}

impl PipelineOptions {
    pub fn serial() -> Self {
        Self {
            single_threaded: true,
            ..Self::default()
        }
    }
}

/// Outcome of a run.
#[derive(Debug, Clone, Default)]
pub struct PipelineReport {
    pub frames_loaded: u64,
    pub frames_skipped: u64,
    pub frames_delivered: u64,
    pub cancelled: bool,
    pub metrics: MetricsSummary,
}

struct Job {
    seq: u64,
    frame: RawFrame,
    permit: OwnedSemaphorePermit,
}

struct Computed<T> {
    seq: u64,
    /// `None` when the computation panicked
    output: Option<T>,
    compute_ms: f64,
    _permit: OwnedSemaphorePermit,
}

/// One query execution.
#[derive(Debug, Clone)]
pub struct Pipeline {
    name: &'static str,
    options: PipelineOptions,
    cancel: CancellationFlag,
}

impl Pipeline {
    pub fn new(name: &'static str, options: PipelineOptions) -> Self {
        Self {
            name,
            options,
            cancel: CancellationFlag::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation(&self) -> &CancellationFlag {
        &self.cancel
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Runs `compute` on every frame of `sources` in `[start, end)` and
    /// delivers the results to `sink` in load order.
    #[instrument(
        name = "pipeline_run",
        skip_all,
        fields(
            query = self.name,
            workers = self.options.workers,
            serial = self.options.single_threaded
        )
    )]
    pub async fn run<T, F>(
        &self,
        sources: &[Arc<dyn FrameSource>],
        start: Option<Time>,
        end: Option<Time>,
        compute: F,
        sink: &mut dyn FrameSink<T>,
    ) -> Result<PipelineReport>
    where
        T: FrameOutput,
        F: Fn(RawFrame) -> T + Send + Sync + 'static,
    {
        let ingestion = Arc::new(IngestionMetrics::new());
        let stream = MergedFrameStream::new(sources, start, end, Arc::clone(&ingestion))?;
        let mut metrics = QueryMetricsAggregator::new();

        let (delivered, cancelled) = if self.options.single_threaded {
            self.run_serial(stream, compute, sink, &mut metrics)?
        } else {
            self.run_parallel(stream, Arc::new(compute), sink, &mut metrics)
                .await?
        };

        sink.finish()
            .map_err(|e| QueryError::sink(sink.name(), e))?;

        let loaded = ingestion.snapshot();
        metrics.add_skipped(loaded.frames_skipped);
        let report = PipelineReport {
            frames_loaded: loaded.frames_loaded,
            frames_skipped: loaded.frames_skipped,
            frames_delivered: delivered,
            cancelled,
            metrics: metrics.summary(),
        };
        info!(
            loaded = report.frames_loaded,
            skipped = report.frames_skipped,
            delivered = report.frames_delivered,
            cancelled = report.cancelled,
            "Query finished"
        );
        Ok(report)
    }

    fn run_serial<T, F>(
        &self,
        mut stream: MergedFrameStream,
        compute: F,
        sink: &mut dyn FrameSink<T>,
        metrics: &mut QueryMetricsAggregator,
    ) -> Result<(u64, bool)>
    where
        T: FrameOutput,
        F: Fn(RawFrame) -> T,
    {
        let mut delivered = 0;
        loop {
            if self.cancel.is_cancelled() {
                return Ok((delivered, true));
            }
            let Some(frame) = stream.next() else {
                return Ok((delivered, false));
            };
            let started = Instant::now();
            let output = compute(frame);
            let compute_ms = started.elapsed().as_secs_f64() * 1e3;
            self.deliver(sink, output, compute_ms, metrics)?;
            delivered += 1;
        }
    }

    async fn run_parallel<T, F>(
        &self,
        stream: MergedFrameStream,
        compute: Arc<F>,
        sink: &mut dyn FrameSink<T>,
        metrics: &mut QueryMetricsAggregator,
    ) -> Result<(u64, bool)>
    where
        T: FrameOutput,
        F: Fn(RawFrame) -> T + Send + Sync + 'static,
    {
        let semaphore = Arc::new(Semaphore::new(self.options.max_in_flight));
        let (job_tx, job_rx) = async_channel::bounded::<Job>(self.options.channel_capacity);
        let (result_tx, mut result_rx) = mpsc::unbounded_channel::<Computed<T>>();

        let load = {
            let semaphore = Arc::clone(&semaphore);
            let cancel = self.cancel.clone();
            let handle = Handle::current();
            tokio::task::spawn_blocking(move || load_stage(stream, job_tx, semaphore, cancel, handle))
        };
        let workers: Vec<JoinHandle<()>> = (0..self.options.workers)
            .map(|_| {
                let jobs = job_rx.clone();
                let results = result_tx.clone();
                let compute = Arc::clone(&compute);
                tokio::task::spawn_blocking(move || compute_stage(jobs, results, compute))
            })
            .collect();
        drop(job_rx);
        drop(result_tx);

        let mut reorder: BTreeMap<u64, Computed<T>> = BTreeMap::new();
        let mut next = 0u64;
        let mut failure = None;
        'consume: while let Some(computed) = result_rx.recv().await {
            reorder.insert(computed.seq, computed);
            metrics.observe_reorder_depth(reorder.len());
            observability::record_reorder_depth(reorder.len());

            while let Some(computed) = reorder.remove(&next) {
                let Some(output) = computed.output else {
                    failure = Some(QueryError::stage(
                        "compute",
                        format!("worker panicked on frame #{next}"),
                    ));
                    break 'consume;
                };
                if let Err(e) = self.deliver(sink, output, computed.compute_ms, metrics) {
                    failure = Some(e);
                    break 'consume;
                }
                next += 1;
            }
        }

        if let Some(error) = failure {
            warn!(error = %error, "Aborting query");
            self.cancel.cancel();
            semaphore.close();
            drop(result_rx);
            drop(reorder);
            let _ = load.await;
            for worker in workers {
                let _ = worker.await;
            }
            return Err(error);
        }

        let cancelled = load.await.map_err(|e| QueryError::stage("load", e))?;
        for worker in workers {
            worker.await.map_err(|e| QueryError::stage("compute", e))?;
        }
        if !reorder.is_empty() {
            return Err(QueryError::stage(
                "consume",
                format!("{} results never delivered", reorder.len()),
            ));
        }
        debug!(delivered = next, "Pipeline drained");
        Ok((next, cancelled))
    }

    fn deliver<T: FrameOutput>(
        &self,
        sink: &mut dyn FrameSink<T>,
        output: T,
        compute_ms: f64,
        metrics: &mut QueryMetricsAggregator,
    ) -> Result<()> {
        metrics.update(output.ant_count(), output.collision_count(), compute_ms);
        let result = sink.consume(output);
        observability::record_sink_result(sink.name(), result.is_ok());
        result.map_err(|e| QueryError::sink(sink.name(), e))?;
        observability::record_frame_delivered(self.name, compute_ms);
        Ok(())
    }
}

/// Returns whether loading stopped before the end of the stream.
fn load_stage(
    mut stream: MergedFrameStream,
    jobs: Sender<Job>,
    semaphore: Arc<Semaphore>,
    cancel: CancellationFlag,
    handle: Handle,
) -> bool {
    let mut seq = 0u64;
    loop {
        if cancel.is_cancelled() {
            debug!(frames = seq, "Load cancelled");
            return true;
        }
        let Some(frame) = stream.next() else {
            return false;
        };
        let Ok(permit) = handle.block_on(Arc::clone(&semaphore).acquire_owned()) else {
            return true;
        };
        if jobs.send_blocking(Job { seq, frame, permit }).is_err() {
            return true;
        }
        seq += 1;
    }
}

fn compute_stage<T, F>(
    jobs: Receiver<Job>,
    results: mpsc::UnboundedSender<Computed<T>>,
    compute: Arc<F>,
) where
    T: FrameOutput,
    F: Fn(RawFrame) -> T + Send + Sync,
{
    while let Ok(job) = jobs.recv_blocking() {
        let started = Instant::now();
        let frame = job.frame;
        let output = catch_unwind(AssertUnwindSafe(|| compute(frame))).ok();
        let computed = Computed {
            seq: job.seq,
            output,
            compute_ms: started.elapsed().as_secs_f64() * 1e3,
            _permit: job.permit,
        };
        if results.send(computed).is_err() {
            break;
        }
    }
}
