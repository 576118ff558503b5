//! 查询流水线指标收集模块
//!
//! 记录帧交付、重排缓冲深度、分段输出与统计缓存命中情况。

use metrics::{counter, gauge, histogram};

/// 记录一帧交付给消费者
///
/// `compute_ms` 为该帧在计算线程上花费的时间。
pub fn record_frame_delivered(query: &'static str, compute_ms: f64) {
    counter!("colony_frames_delivered_total", "query" => query).increment(1);
    histogram!("colony_frame_compute_ms", "query" => query).record(compute_ms);
}

/// 记录重排缓冲区深度（已计算但尚未按序交付的帧数）
pub fn record_reorder_depth(depth: usize) {
    gauge!("colony_reorder_buffer_depth").set(depth as f64);
}

/// 记录输出的轨迹数
pub fn record_trajectories_emitted(count: usize) {
    if count > 0 {
        counter!("colony_trajectories_emitted_total").increment(count as u64);
    }
}

/// 记录输出的交互数
pub fn record_interactions_emitted(count: usize) {
    if count > 0 {
        counter!("colony_interactions_emitted_total").increment(count as u64);
    }
}

/// 记录统计缓存查询结果
pub fn record_cache_lookup(hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    counter!("colony_statistics_cache_total", "result" => result).increment(1);
}

/// 记录结果写入 sink
pub fn record_sink_result(sink_name: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "colony_sink_items_total",
        "sink" => sink_name.to_string(),
        "status" => status
    )
    .increment(1);
}

/// 查询指标聚合器
///
/// 在内存中聚合一次查询的指标，便于输出摘要。
#[derive(Debug, Clone, Default)]
pub struct QueryMetricsAggregator {
    /// 交付帧数
    pub total_frames: u64,

    /// 跳过的损坏帧数
    pub frames_skipped: u64,

    /// 每帧识别出的蚂蚁数
    pub positions_stats: RunningStats,

    /// 每帧碰撞数
    pub collisions_stats: RunningStats,

    /// 每帧计算耗时 (毫秒)
    pub compute_stats: RunningStats,

    /// 重排缓冲区最大深度
    pub max_reorder_depth: usize,
}

impl QueryMetricsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 更新一帧的统计
    pub fn update(&mut self, positions: usize, collisions: Option<usize>, compute_ms: f64) {
        self.total_frames += 1;
        self.positions_stats.push(positions as f64);
        if let Some(collisions) = collisions {
            self.collisions_stats.push(collisions as f64);
        }
        self.compute_stats.push(compute_ms);
    }

    pub fn observe_reorder_depth(&mut self, depth: usize) {
        self.max_reorder_depth = self.max_reorder_depth.max(depth);
    }

    pub fn add_skipped(&mut self, skipped: u64) {
        self.frames_skipped += skipped;
    }

    /// 生成摘要报告
    pub fn summary(&self) -> MetricsSummary {
        let seen = self.total_frames + self.frames_skipped;
        MetricsSummary {
            total_frames: self.total_frames,
            frames_skipped: self.frames_skipped,
            skip_rate: if seen > 0 {
                self.frames_skipped as f64 / seen as f64 * 100.0
            } else {
                0.0
            },
            positions_per_frame: StatsSummary::from(&self.positions_stats),
            collisions_per_frame: StatsSummary::from(&self.collisions_stats),
            compute_ms: StatsSummary::from(&self.compute_stats),
            max_reorder_depth: self.max_reorder_depth,
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_frames: u64,
    pub frames_skipped: u64,
    pub skip_rate: f64,
    pub positions_per_frame: StatsSummary,
    pub collisions_per_frame: StatsSummary,
    pub compute_ms: StatsSummary,
    pub max_reorder_depth: usize,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Query Metrics Summary ===")?;
        writeln!(f, "Delivered frames: {}", self.total_frames)?;
        writeln!(
            f,
            "Skipped frames: {} ({:.2}%)",
            self.frames_skipped, self.skip_rate
        )?;
        writeln!(f, "Ants per frame: {}", self.positions_per_frame)?;
        writeln!(f, "Collisions per frame: {}", self.collisions_per_frame)?;
        writeln!(f, "Compute time (ms): {}", self.compute_ms)?;
        writeln!(f, "Max reorder depth: {}", self.max_reorder_depth)?;
        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        let (min, max) = stats.range.unwrap_or_default();
        Self {
            count: stats.count,
            min,
            max,
            mean: stats.mean,
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.count {
            0 => write!(f, "N/A"),
            n => write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={n})",
                self.min, self.max, self.mean, self.std_dev
            ),
        }
    }
}

/// Welford 在线均值/方差
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    /// 与均值之差的平方和
    m2: f64,
    range: Option<(f64, f64)>,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;
        self.range = Some(match self.range {
            None => (value, value),
            Some((lo, hi)) => (lo.min(value), hi.max(value)),
        });
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    /// 合并另一组样本 (Chan 并行公式)
    pub fn merge(&mut self, other: &RunningStats) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = other.clone();
            return;
        }
        let count = self.count + other.count;
        let delta = other.mean - self.mean;
        self.mean += delta * other.count as f64 / count as f64;
        self.m2 += other.m2 + delta * delta * (self.count * other.count) as f64 / count as f64;
        self.count = count;
        if let (Some((lo, hi)), Some((olo, ohi))) = (self.range, other.range) {
            self.range = Some((lo.min(olo), hi.max(ohi)));
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// 样本方差
    pub fn variance(&self) -> f64 {
        match self.count {
            0 | 1 => 0.0,
            n => self.m2 / (n - 1) as f64,
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> Option<f64> {
        self.range.map(|(lo, _)| lo)
    }

    pub fn max(&self) -> Option<f64> {
        self.range.map(|(_, hi)| hi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();
        for v in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
            stats.push(v);
        }

        assert_eq!(stats.count(), 8);
        assert!((stats.mean() - 5.0).abs() < 1e-10);
        assert_eq!(stats.min(), Some(2.0));
        assert_eq!(stats.max(), Some(9.0));
        assert!((stats.variance() - 32.0 / 7.0).abs() < 1e-10);
        assert_eq!(RunningStats::default().min(), None);
    }

    #[test]
    fn test_merge_matches_single_pass() {
        let values = [1.5, 3.0, -2.0, 8.25, 4.0, 4.0, 0.5];
        let mut whole = RunningStats::default();
        values.iter().for_each(|v| whole.push(*v));

        let mut left = RunningStats::default();
        let mut right = RunningStats::default();
        values[..3].iter().for_each(|v| left.push(*v));
        values[3..].iter().for_each(|v| right.push(*v));
        left.merge(&right);
        left.merge(&RunningStats::default());

        assert_eq!(left.count(), whole.count());
        assert!((left.mean() - whole.mean()).abs() < 1e-10);
        assert!((left.variance() - whole.variance()).abs() < 1e-10);
        assert_eq!(left.min(), Some(-2.0));
        assert_eq!(left.max(), Some(8.25));
    }

    #[test]
    fn test_aggregator_update() {
        let mut aggregator = QueryMetricsAggregator::new();
        aggregator.update(4, Some(1), 0.5);
        aggregator.update(6, None, 1.5);
        aggregator.observe_reorder_depth(3);
        aggregator.observe_reorder_depth(1);
        aggregator.add_skipped(2);

        let summary = aggregator.summary();
        assert_eq!(summary.total_frames, 2);
        assert_eq!(summary.frames_skipped, 2);
        assert!((summary.skip_rate - 50.0).abs() < 1e-10);
        assert_eq!(summary.positions_per_frame.count, 2);
        assert!((summary.positions_per_frame.mean - 5.0).abs() < 1e-10);
        assert_eq!(summary.collisions_per_frame.count, 1);
        assert_eq!(summary.max_reorder_depth, 3);
    }

    #[test]
    fn test_summary_display() {
        let mut aggregator = QueryMetricsAggregator::new();
        for i in 0..100 {
            aggregator.update(10, Some(i % 3), 2.0);
        }
        let output = format!("{}", aggregator.summary());
        assert!(output.contains("Delivered frames: 100"));
        assert!(output.contains("Skipped frames: 0 (0.00%)"));
        assert!(output.contains("Collisions per frame: min=0.000"));
    }

    #[test]
    fn test_metric_calls_without_recorder() {
        record_frame_delivered("identify_frames", 1.0);
        record_reorder_depth(4);
        record_trajectories_emitted(2);
        record_interactions_emitted(0);
        record_cache_lookup(true);
        record_sink_result("vec", false);
    }
}
