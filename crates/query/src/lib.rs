//! # Query
//!
//! 查询引擎：在多个空间的帧上并行执行识别、碰撞与分段查询。
//!
//! 负责：
//! - Load：按时间归并各空间的帧（`ingestion::MergedFrameStream`）
//! - Compute：多个阻塞线程上的识别 / 区域 / 碰撞计算
//! - Consume：按加载顺序重排后交付给 sink 或分段器
//! - 背压（信号量）与协作式取消
//!
//! ## 使用示例
//!
//! ```ignore
//! use query::{QueryArgs, QueryEngine, QuerySnapshot};
//!
//! let snapshot = QuerySnapshot::compile(&identifier, &zones, shapes, TypeFilter::default());
//! let engine = QueryEngine::new(sources, snapshot);
//!
//! let mut trajectories = VecSink::new();
//! let mut interactions = VecSink::new();
//! let report = engine
//!     .compute_interactions(&QueryArgs::default(), &mut trajectories, &mut interactions)
//!     .await?;
//! ```

mod cancel;
mod engine;
mod error;
mod matcher;
mod pipeline;
mod snapshot;

// Re-exports
pub use cancel::CancellationFlag;
pub use engine::{QueryArgs, QueryEngine};
pub use error::{QueryError, Result};
pub use matcher::Matcher;
pub use pipeline::{FrameOutput, Pipeline, PipelineOptions, PipelineReport};
pub use snapshot::QuerySnapshot;
