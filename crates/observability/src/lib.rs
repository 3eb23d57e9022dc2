//! # Observability
//!
//! 日志与指标的统一入口。
//!
//! - `tracing` 订阅者：JSON / Pretty / Compact 三种输出
//! - Prometheus 拉取端点 (可选)
//! - 每次 `process_mipi_data` 调用的指标记录与汇总
//!
//! ```ignore
//! observability::init()?;
//!
//! let report = processor.process_mipi_data(&batch);
//! observability::record_call_metrics(&sample);
//! ```

pub mod metrics;

use std::net::{Ipv4Addr, SocketAddr};

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub use crate::metrics::{
    record_call_metrics, record_export_queue, CallSample, FrameMetricsAggregator,
    MetricsSummary, RunningStats, StatsSummary,
};

/// 默认 Prometheus 端口
pub const DEFAULT_METRICS_PORT: u16 = 9000;

/// 工作区内的 crate，默认级别只作用于它们；第三方库固定为 warn
const WORKSPACE_TARGETS: &[&str] = &[
    "contracts",
    "config_loader",
    "ingestion",
    "sync_engine",
    "imaging",
    "publisher",
    "processor",
    "observability",
    "celex_mipi",
];

/// 以默认配置初始化：JSON 日志 + 9000 端口
pub fn init() -> Result<()> {
    init_with_config(ObservabilityConfig::default())
}

/// 可观测性配置
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub log_format: LogFormat,
    /// None 表示不启动 Prometheus
    pub metrics_port: Option<u16>,
    /// 工作区 crate 的日志级别 (RUST_LOG 未设置时生效)
    pub default_log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Json,
            metrics_port: Some(DEFAULT_METRICS_PORT),
            default_log_level: "info".to_string(),
        }
    }
}

/// 日志输出格式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

/// `warn,processor=debug,ingestion=debug,...`
fn default_directives(level: &str) -> String {
    let mut directives = String::from("warn");
    for target in WORKSPACE_TARGETS {
        directives.push(',');
        directives.push_str(target);
        directives.push('=');
        directives.push_str(level);
    }
    directives
}

fn env_filter(level: &str) -> EnvFilter {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new(default_directives(level)),
    }
}

/// 安装全局订阅者，并按需启动指标端点
pub fn init_with_config(config: ObservabilityConfig) -> Result<()> {
    let registry = tracing_subscriber::registry().with(env_filter(&config.default_log_level));

    match config.log_format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_thread_names(true)
                    .with_line_number(true),
            )
            .try_init(),
        LogFormat::Pretty => registry.with(fmt::layer().pretty()).try_init(),
        LogFormat::Compact => registry
            .with(fmt::layer().compact().with_target(false))
            .try_init(),
    }
    .context("tracing subscriber already installed")?;

    if let Some(port) = config.metrics_port {
        serve_metrics(port)?;
    }

    tracing::debug!(
        log_format = ?config.log_format,
        level = %config.default_log_level,
        "logging ready"
    );
    Ok(())
}

/// 只启动 Prometheus 端点，日志由调用方自行初始化
pub fn serve_metrics(port: u16) -> Result<SocketAddr> {
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .with_context(|| format!("cannot serve metrics on {addr}"))?;

    tracing::info!(%addr, "metrics endpoint listening");
    Ok(addr)
}
