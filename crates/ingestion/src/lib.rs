//! # Ingestion
//!
//! Load stage of the query pipeline.
//!
//! Responsibilities:
//! - Position one cursor per space on the query start
//! - Merge the spaces into a single stream ordered by `(time, space, frame)`
//! - Skip and count malformed frames
//! - Provide in-memory and synthetic frame sources
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::{IngestionMetrics, MergedFrameStream, SyntheticColony};
//!
//! let source = SyntheticColony::new(Default::default())?.generate()?;
//! let stream = MergedFrameStream::new(&[Arc::new(source)], None, None, Arc::new(IngestionMetrics::new()))?;
//! for frame in stream {
//!     // Process raw frame
//! }
//! ```

mod config;
mod error;
mod memory;
mod merge;
mod synthetic;

// Re-exports
pub use config::{IngestionMetrics, MetricsSnapshot};
pub use error::{IngestionError, Result};
pub use memory::{MemoryFrameSource, MemorySegment};
pub use merge::MergedFrameStream;
pub use synthetic::{SyntheticColony, SyntheticColonyConfig};
