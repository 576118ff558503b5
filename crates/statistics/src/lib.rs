//! # Statistics
//!
//! 标签检测统计。
//!
//! 负责：
//! - 逐段扫描帧，统计每个标签的出现次数、同帧多次出现次数与间隔分布
//! - 按时间顺序合并相邻时间窗（结合律成立，接缝间隔只计一次）
//! - 合并不同空间的统计（交换律成立）
//! - 以 bincode 旁路文件缓存每段结果，版本或检测参数不符即重新计算
//!
//! ## 使用示例
//!
//! ```ignore
//! use statistics::{StatisticsAggregator, StatisticsCache};
//!
//! let aggregator = StatisticsAggregator::new(StatisticsCache::new());
//! let stats = aggregator.compute(&sources)?;
//! for (tag, s) in &stats.tags {
//!     println!("{tag}: {}", s.count(TagCounter::TotalSeen));
//! }
//! ```

mod aggregator;
mod cache;
mod compute;
mod error;

pub use aggregator::{into_tag_list, StatisticsAggregator};
pub use cache::{CacheLookup, StatisticsCache};
pub use compute::{compute_gap, compute_segment, TagStatisticsExt, TimedStatistics};
pub use error::{Result, StatisticsError};
