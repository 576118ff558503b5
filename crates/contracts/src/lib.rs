//! # Contracts
//!
//! Frozen interface contracts shared by every crate of the workspace: identifiers,
//! the time model, frame records, trajectory/interaction outputs, tag statistics,
//! the frame source / sink traits and the engine configuration.
//! Business crates only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Wall clock in nanoseconds since the Unix epoch orders every record
//! - An optional monotonic stamp identifies the acquisition clock; gaps are only
//!   measurable between two times of the same clock identity

mod config;
mod error;
mod frame;
mod frame_source;
mod ids;
mod sink;
mod statistics;
mod time;
mod trajectory;

pub use config::*;
pub use error::*;
pub use frame::*;
pub use frame_source::{DetectionSettings, FrameCursor, FrameResult, FrameSegment, FrameSource, TagFamily};
pub use ids::{AntId, FrameId, IdentificationId, SpaceId, TagId, ZoneId};
pub use sink::*;
pub use statistics::*;
pub use time::{Duration, Interval, MonoClockId, MonoStamp, Time, TimeEdge};
pub use trajectory::*;
