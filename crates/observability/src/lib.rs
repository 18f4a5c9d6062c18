//! # Observability
//!
//! 可观测性模块：Tracing + Prometheus 指标。
//!
//! ## 功能
//!
//! - Tracing 初始化 (JSON/Pretty/Compact 格式)
//! - Prometheus 指标导出
//! - 调度 tick 指标收集与统计
//!
//! ## 使用示例
//!
//! ```ignore
//! use observability::{LogFormat, TracingConfig};
//!
//! // 初始化日志，-v 一次即 debug
//! observability::init_tracing(&TracingConfig::from_verbosity(LogFormat::Pretty, 1, false))?;
//! // 启动 Prometheus 导出
//! observability::init_metrics(9000)?;
//!
//! // 记录 tick 指标
//! let report = driver.tick().await;
//! if let Some(channel) = &report.channel {
//!     metrics::record_tick(channel, report.dispatched, report.lateness_ms);
//! }
//! ```

pub mod metrics;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

// Re-exports
pub use crate::metrics::{
    record_action_dispatched, record_channel_failure, record_dump, record_queue_depth,
    record_record_skipped, record_recording_active, record_registry_size, record_tick,
    RunningStats, StatsSummary, TickStatsAggregator, TickSummary,
};

/// 日志格式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON 结构化日志
    Json,
    /// 人类可读格式
    #[default]
    Pretty,
    /// 紧凑单行格式
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            other => Err(format!("unknown log format '{other}' (json, pretty, compact)")),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingConfig {
    /// 日志格式
    pub format: LogFormat,
    /// 默认过滤器（RUST_LOG 未设置时使用）
    pub default_filter: String,
    /// 是否读取 RUST_LOG
    pub honor_env: bool,
}

impl TracingConfig {
    /// 由命令行的 `-v` 次数与 `-q` 推导
    ///
    /// `quiet` 强制 `warn`，忽略 RUST_LOG。
    pub fn from_verbosity(format: LogFormat, verbose: u8, quiet: bool) -> Self {
        let (default_filter, honor_env) = if quiet {
            ("warn", false)
        } else {
            let level = match verbose {
                0 => "info",
                1 => "debug",
                _ => "trace",
            };
            (level, true)
        };
        Self {
            format,
            default_filter: default_filter.to_string(),
            honor_env,
        }
    }

    fn filter(&self) -> EnvFilter {
        if self.honor_env {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.default_filter))
        } else {
            EnvFilter::new(&self.default_filter)
        }
    }
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self::from_verbosity(LogFormat::default(), 0, false)
    }
}

/// 初始化全局 Tracing subscriber
pub fn init_tracing(config: &TracingConfig) -> Result<()> {
    let fmt_layer = match config.format {
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
        .with(config.filter())
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    tracing::debug!(format = ?config.format, filter = %config.default_filter, "tracing initialized");
    Ok(())
}

/// 初始化 Prometheus 指标导出（监听 0.0.0.0:port）
pub fn init_metrics(port: u16) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .context("Failed to install Prometheus recorder")?;

    tracing::info!(port = port, "Prometheus metrics endpoint initialized");
    Ok(())
}
