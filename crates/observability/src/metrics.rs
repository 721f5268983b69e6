//! 桥接指标收集模块
//!
//! 记录消息分发、文件落盘与远端投递的运行指标。

use std::time::Duration;

use contracts::DeliveryOutcome;
use metrics::{counter, histogram};

/// 记录消息分发
///
/// 每个出队消息调用一次，`sinks` 为本次调度的 sink 数量。
pub fn record_message_dispatched(sinks: usize) {
    counter!("astm_bridge_messages_dispatched_total").increment(1);
    if sinks == 0 {
        counter!("astm_bridge_messages_unrouted_total").increment(1);
    }
}

/// 记录文件写入
pub fn record_file_write(success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "astm_bridge_file_writes_total",
        "status" => status
    )
    .increment(1);
}

/// 记录一次投递的最终结果
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_delivery;
///
/// let started = Instant::now();
/// let outcome = sink.deliver(&message).await;
/// record_delivery(&outcome, started.elapsed());
/// ```
pub fn record_delivery(outcome: &DeliveryOutcome, elapsed: Duration) {
    let status = if outcome.success { "success" } else { "failure" };
    counter!(
        "astm_bridge_deliveries_total",
        "status" => status
    )
    .increment(1);

    histogram!("astm_bridge_delivery_attempts").record(f64::from(outcome.attempts_made));
    histogram!("astm_bridge_delivery_duration_ms").record(elapsed.as_secs_f64() * 1000.0);
}

/// 记录投递重试
pub fn record_delivery_retry() {
    counter!("astm_bridge_delivery_retries_total").increment(1);
}

/// 记录关闭时被取消的 sink 任务
pub fn record_sink_cancelled(count: usize) {
    if count > 0 {
        counter!("astm_bridge_sink_tasks_cancelled_total").increment(count as u64);
    }
}

/// 投递指标聚合器
///
/// 在内存中聚合投递结果，便于运行结束时输出摘要。
#[derive(Debug, Clone, Default)]
pub struct DeliveryStats {
    /// 成功投递数
    pub succeeded: u64,

    /// 最终失败数
    pub failed: u64,

    /// 每次投递的尝试次数
    attempts: RunningStats,

    /// 每次投递耗时 (毫秒)
    duration_ms: RunningStats,
}

impl DeliveryStats {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 更新聚合统计
    pub fn update(&mut self, outcome: &DeliveryOutcome, elapsed: Duration) {
        if outcome.success {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
        self.attempts.push(f64::from(outcome.attempts_made));
        self.duration_ms.push(elapsed.as_secs_f64() * 1000.0);
    }

    /// 生成摘要报告
    pub fn summary(&self) -> DeliverySummary {
        let total = self.succeeded + self.failed;
        DeliverySummary {
            succeeded: self.succeeded,
            failed: self.failed,
            success_rate: if total > 0 {
                self.succeeded as f64 / total as f64 * 100.0
            } else {
                0.0
            },
            attempts: StatsSummary::from(&self.attempts),
            duration_ms: StatsSummary::from(&self.duration_ms),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 投递摘要
#[derive(Debug, Clone, Default)]
pub struct DeliverySummary {
    pub succeeded: u64,
    pub failed: u64,
    pub success_rate: f64,
    pub attempts: StatsSummary,
    pub duration_ms: StatsSummary,
}

impl std::fmt::Display for DeliverySummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Delivery Summary ===")?;
        writeln!(
            f,
            "Delivered: {} ({:.2}%)",
            self.succeeded, self.success_rate
        )?;
        writeln!(f, "Failed: {}", self.failed)?;
        writeln!(f, "Attempts: {}", self.attempts)?;
        writeln!(f, "Duration (ms): {}", self.duration_ms)?;
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
