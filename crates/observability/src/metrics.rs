//! Driver 指标收集模块
//!
//! 调度循环、录制控制器和事件源的运行指标。

use std::collections::HashMap;

use contracts::{ActionKind, ActionSet};
use metrics::{counter, gauge, histogram};

/// 记录一次 tick
///
/// 每次调度器服务一个 channel 时调用。`lateness_ms` 是 tick 开始时相对
/// 到期时间的延迟（提前为 0）。
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_tick;
///
/// let report = driver.tick().await;
/// if let Some(channel) = &report.channel {
///     record_tick(channel, report.dispatched, report.lateness_ms);
/// }
/// ```
pub fn record_tick(channel: &str, dispatched: ActionSet, lateness_ms: f64) {
    counter!("robot_driver_ticks_total", "channel" => channel.to_string()).increment(1);
    histogram!("robot_driver_tick_lateness_ms").record(lateness_ms);

    for kind in dispatched.iter() {
        record_action_dispatched(kind);
    }
}

/// 记录分发的 sink 动作
pub fn record_action_dispatched(kind: ActionKind) {
    counter!("robot_driver_actions_total", "kind" => kind.as_str()).increment(1);
}

/// 记录因录制锁被占用而跳过的 Record 动作
pub fn record_record_skipped(channel: &str) {
    counter!("robot_driver_record_skipped_total", "channel" => channel.to_string()).increment(1);
}

/// 记录 channel 采集/转换失败
pub fn record_channel_failure(channel: &str) {
    counter!("robot_driver_channel_failures_total", "channel" => channel.to_string()).increment(1);
}

/// 记录调度队列深度
pub fn record_queue_depth(depth: usize) {
    gauge!("robot_driver_queue_depth").set(depth as f64);
}

/// 记录注册表规模
pub fn record_registry_size(channels: usize, events: usize) {
    gauge!("robot_driver_registered_channels").set(channels as f64);
    gauge!("robot_driver_registered_events").set(events as f64);
}

/// 记录 dump 结果 (`written` / `nothing_matched` / 错误标签)
pub fn record_dump(outcome: &str) {
    counter!("robot_driver_dumps_total", "outcome" => outcome.to_string()).increment(1);
}

/// 记录录制会话状态
pub fn record_recording_active(active: bool) {
    gauge!("robot_driver_recording_active").set(if active { 1.0 } else { 0.0 });
}

/// Tick 统计聚合器
///
/// 在内存中聚合 tick 结果，便于运行结束时输出摘要。
#[derive(Debug, Clone, Default)]
pub struct TickStatsAggregator {
    /// 服务过 channel 的 tick 数
    pub total_ticks: u64,

    /// 空队列 tick 数
    pub idle_ticks: u64,

    /// 各动作分发次数
    pub dispatched: HashMap<ActionKind, u64>,

    /// 跳过的 Record 动作
    pub record_skipped: u64,

    /// 失败的 tick 数
    pub failures: u64,

    /// 延迟统计 (毫秒)
    pub lateness_stats: RunningStats,

    /// 各 channel tick 次数
    pub channel_ticks: HashMap<String, u64>,
}

impl TickStatsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录空队列 tick
    pub fn observe_idle(&mut self) {
        self.idle_ticks += 1;
    }

    /// 更新聚合统计
    pub fn observe(
        &mut self,
        channel: &str,
        dispatched: ActionSet,
        record_skipped: bool,
        failed: bool,
        lateness_ms: f64,
    ) {
        self.total_ticks += 1;
        *self.channel_ticks.entry(channel.to_string()).or_insert(0) += 1;

        for kind in dispatched.iter() {
            *self.dispatched.entry(kind).or_insert(0) += 1;
        }
        if record_skipped {
            self.record_skipped += 1;
        }
        if failed {
            self.failures += 1;
        }
        self.lateness_stats.push(lateness_ms);
    }

    /// 生成摘要报告
    pub fn summary(&self) -> TickSummary {
        let count = |kind| self.dispatched.get(&kind).copied().unwrap_or(0);
        TickSummary {
            total_ticks: self.total_ticks,
            idle_ticks: self.idle_ticks,
            published: count(ActionKind::Publish),
            recorded: count(ActionKind::Record),
            buffered: count(ActionKind::LogBuffer),
            record_skipped: self.record_skipped,
            failures: self.failures,
            failure_rate: if self.total_ticks > 0 {
                self.failures as f64 / self.total_ticks as f64 * 100.0
            } else {
                0.0
            },
            lateness_ms: StatsSummary::from(&self.lateness_stats),
            channel_ticks: self.channel_ticks.clone(),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Tick 摘要
#[derive(Debug, Clone, Default)]
pub struct TickSummary {
    pub total_ticks: u64,
    pub idle_ticks: u64,
    pub published: u64,
    pub recorded: u64,
    pub buffered: u64,
    pub record_skipped: u64,
    pub failures: u64,
    pub failure_rate: f64,
    pub lateness_ms: StatsSummary,
    pub channel_ticks: HashMap<String, u64>,
}

impl std::fmt::Display for TickSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Driver Tick Summary ===")?;
        writeln!(f, "Total ticks: {} (idle: {})", self.total_ticks, self.idle_ticks)?;
        writeln!(
            f,
            "Dispatched: publish={}, record={}, log_buffer={}",
            self.published, self.recorded, self.buffered
        )?;
        writeln!(f, "Skipped records: {}", self.record_skipped)?;
        writeln!(
            f,
            "Failed ticks: {} ({:.2}%)",
            self.failures, self.failure_rate
        )?;
        writeln!(f, "Tick lateness (ms): {}", self.lateness_ms)?;

        if !self.channel_ticks.is_empty() {
            writeln!(f, "Ticks per channel:")?;
            let mut channels: Vec<_> = self.channel_ticks.iter().collect();
            channels.sort();
            for (channel, count) in channels {
                writeln!(f, "  {}: {}", channel, count)?;
            }
        }

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
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    /// 样本数量
    pub fn count(&self) -> u64 {
        self.count
    }

    /// 均值
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// 标准差
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// 最小值
    pub fn min(&self) -> f64 {
        self.min
    }

    /// 最大值
    pub fn max(&self) -> f64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();

        stats.push(1.0);
        stats.push(2.0);
        stats.push(3.0);
        stats.push(4.0);
        stats.push(5.0);

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_aggregator_observe() {
        let mut aggregator = TickStatsAggregator::new();
        let dispatched: ActionSet = [ActionKind::Publish, ActionKind::LogBuffer].into_iter().collect();

        aggregator.observe("battery", dispatched, true, false, 0.5);
        aggregator.observe("battery", ActionSet::empty(), false, true, 1.5);
        aggregator.observe_idle();

        assert_eq!(aggregator.total_ticks, 2);
        assert_eq!(aggregator.idle_ticks, 1);
        assert_eq!(aggregator.record_skipped, 1);
        assert_eq!(aggregator.failures, 1);
        assert_eq!(aggregator.channel_ticks.get("battery"), Some(&2));

        let summary = aggregator.summary();
        assert_eq!(summary.published, 1);
        assert_eq!(summary.buffered, 1);
        assert_eq!(summary.recorded, 0);
        assert!((summary.failure_rate - 50.0).abs() < 1e-10);
    }

    #[test]
    fn test_summary_display() {
        let summary = TickSummary {
            total_ticks: 200,
            idle_ticks: 3,
            published: 150,
            recorded: 40,
            buffered: 180,
            record_skipped: 2,
            failures: 4,
            failure_rate: 2.0,
            lateness_ms: StatsSummary {
                count: 200,
                min: 0.0,
                max: 3.0,
                mean: 0.4,
                std_dev: 0.2,
            },
            channel_ticks: HashMap::from([("sonar".to_string(), 200)]),
        };

        let output = format!("{}", summary);
        assert!(output.contains("Total ticks: 200"));
        assert!(output.contains("2.00%"));
        assert!(output.contains("sonar: 200"));
    }

    #[test]
    fn test_record_helpers_without_recorder() {
        // No global recorder installed: helpers must be no-ops
        record_tick("battery", ActionSet::empty(), 0.0);
        record_record_skipped("battery");
        record_dump("written");
    }
}
