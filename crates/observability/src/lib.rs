//! # Observability
//!
//! 可观测性模块：Tracing + Prometheus 指标。
//!
//! ## 功能
//!
//! - Tracing 初始化 (JSON/Pretty/Compact 格式)
//! - Prometheus 指标导出
//! - 投递结果统计
//!
//! ## 使用示例
//!
//! ```ignore
//! use observability::{init_with_config, metrics, LogFormat, ObservabilityConfig};
//!
//! // 初始化（-v 对应 verbose = 1）
//! init_with_config(&ObservabilityConfig::from_verbosity(LogFormat::Json, 1, false))?;
//!
//! // 记录投递结果
//! let outcome = remote_sink.deliver(&message).await;
//! metrics::record_delivery(&outcome, started.elapsed());
//! ```

pub mod metrics;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

// Re-exports
pub use crate::metrics::{
    record_delivery, record_delivery_retry, record_file_write, record_message_dispatched,
    record_sink_cancelled, DeliveryStats, DeliverySummary, RunningStats, StatsSummary,
};

/// 日志配置
///
/// 由命令行的 `-v`/`-q`/`--log-format` 构造。
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// 日志格式
    pub log_format: LogFormat,
    /// 未设置 RUST_LOG 时使用的日志级别
    pub default_log_level: String,
    /// 忽略 RUST_LOG，始终使用 `default_log_level`
    pub ignore_env: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self::from_verbosity(LogFormat::default(), 0, false)
    }
}

impl ObservabilityConfig {
    /// `quiet` 只保留警告和错误；`verbose` 为 1 时 debug，>= 2 时 trace
    pub fn from_verbosity(log_format: LogFormat, verbose: u8, quiet: bool) -> Self {
        let level = match (quiet, verbose) {
            (true, _) => "warn",
            (false, 0) => "info",
            (false, 1) => "debug",
            (false, _) => "trace",
        };
        Self {
            log_format,
            default_log_level: level.to_string(),
            ignore_env: quiet,
        }
    }

    fn env_filter(&self) -> EnvFilter {
        if self.ignore_env {
            return EnvFilter::new(&self.default_log_level);
        }
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&self.default_log_level))
    }
}

/// 日志格式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON 结构化日志（含线程与源码位置）
    Json,
    /// 人类可读格式
    #[default]
    Pretty,
    /// 紧凑单行格式
    Compact,
}

/// 初始化 Tracing
///
/// 进程内只能调用一次；重复初始化返回错误。
pub fn init_with_config(config: &ObservabilityConfig) -> Result<()> {
    let fmt_layer = match config.log_format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
        LogFormat::Compact => fmt::layer().compact().boxed(),
    };

    tracing_subscriber::registry()
        .with(config.env_filter())
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    tracing::debug!(
        log_format = ?config.log_format,
        level = %config.default_log_level,
        "Logging initialized"
    );
    Ok(())
}

/// 仅初始化 Prometheus 指标（不初始化 Tracing）
///
/// 用于 Tracing 已由其他模块初始化的场景。
pub fn init_metrics_only(port: u16) -> Result<()> {
    let builder = PrometheusBuilder::new();
    builder
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .context("Failed to install Prometheus recorder")?;

    tracing::info!(port = port, "Prometheus metrics endpoint initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ObservabilityConfig::default();
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.default_log_level, "info");
        assert!(!config.ignore_env);
    }

    #[test]
    fn test_verbosity_levels() {
        let level = |verbose, quiet| {
            ObservabilityConfig::from_verbosity(LogFormat::Compact, verbose, quiet)
                .default_log_level
        };
        assert_eq!(level(1, false), "debug");
        assert_eq!(level(2, false), "trace");
        assert_eq!(level(5, false), "trace");
        assert_eq!(level(0, true), "warn");
    }

    #[test]
    fn test_quiet_ignores_env() {
        let config = ObservabilityConfig::from_verbosity(LogFormat::Json, 0, true);
        assert!(config.ignore_env);
        assert_eq!(config.env_filter().to_string(), "warn");
    }
}
