//! # Segmenter
//!
//! 轨迹与交互分段器。
//!
//! 负责：
//! - 按蚂蚁将连续位置拼接为轨迹（间隔不超过 `max_gap`，同一空间，同一时钟）
//! - 将连续碰撞合并为交互，并引用两条轨迹中的样本区间
//! - 丢弃只持续一个瞬间的交互
//!
//! ## 使用示例
//!
//! ```ignore
//! use segmenter::{Segmenter, SegmenterConfig};
//!
//! let mut segmenter = Segmenter::new(SegmenterConfig::default());
//!
//! for (frame, collisions) in frames {
//!     let out = segmenter.push(&frame, Some(&collisions));
//!     emit(out.trajectories, out.interactions);
//! }
//! let rest = segmenter.flush();
//! ```

mod building;
mod engine;

pub use engine::{SegmentedOutput, Segmenter, SegmenterConfig};
