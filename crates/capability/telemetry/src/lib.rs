//! 追踪、请求 ID 生成与基础计数指标。

use serde::Serialize;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::{EnvFilter, fmt};

/// 请求级追踪标识。
#[derive(Debug, Clone)]
pub struct RequestIds {
    pub request_id: String,
    pub trace_id: String,
}

/// 指标快照（`GET /metrics` 直接序列化输出）。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub device_commands_sent: u64,
    pub device_commands_failed: u64,
    pub device_latency_ms_total: u64,
    pub device_latency_ms_count: u64,
    pub registry_requests: u64,
    pub registry_failures: u64,
    pub requests_timed_out: u64,
    pub backups_succeeded: u64,
    pub backups_failed: u64,
    pub snapshots_pruned: u64,
}

/// 进程内计数指标。
pub struct TelemetryMetrics {
    device_commands_sent: AtomicU64,
    device_commands_failed: AtomicU64,
    device_latency_ms_total: AtomicU64,
    device_latency_ms_count: AtomicU64,
    registry_requests: AtomicU64,
    registry_failures: AtomicU64,
    requests_timed_out: AtomicU64,
    backups_succeeded: AtomicU64,
    backups_failed: AtomicU64,
    snapshots_pruned: AtomicU64,
}

impl TelemetryMetrics {
    pub fn new() -> Self {
        Self {
            device_commands_sent: AtomicU64::new(0),
            device_commands_failed: AtomicU64::new(0),
            device_latency_ms_total: AtomicU64::new(0),
            device_latency_ms_count: AtomicU64::new(0),
            registry_requests: AtomicU64::new(0),
            registry_failures: AtomicU64::new(0),
            requests_timed_out: AtomicU64::new(0),
            backups_succeeded: AtomicU64::new(0),
            backups_failed: AtomicU64::new(0),
            snapshots_pruned: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            device_commands_sent: self.device_commands_sent.load(Ordering::Relaxed),
            device_commands_failed: self.device_commands_failed.load(Ordering::Relaxed),
            device_latency_ms_total: self.device_latency_ms_total.load(Ordering::Relaxed),
            device_latency_ms_count: self.device_latency_ms_count.load(Ordering::Relaxed),
            registry_requests: self.registry_requests.load(Ordering::Relaxed),
            registry_failures: self.registry_failures.load(Ordering::Relaxed),
            requests_timed_out: self.requests_timed_out.load(Ordering::Relaxed),
            backups_succeeded: self.backups_succeeded.load(Ordering::Relaxed),
            backups_failed: self.backups_failed.load(Ordering::Relaxed),
            snapshots_pruned: self.snapshots_pruned.load(Ordering::Relaxed),
        }
    }
}

impl Default for TelemetryMetrics {
    fn default() -> Self {
        Self::new()
    }
}

static METRICS: OnceLock<TelemetryMetrics> = OnceLock::new();

/// 获取全局指标实例。
pub fn metrics() -> &'static TelemetryMetrics {
    METRICS.get_or_init(TelemetryMetrics::new)
}

/// 初始化 tracing。
///
/// `RUST_LOG` 优先；未设置时使用 `default_level`（无法解析时回退到 info）。
pub fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

/// 生成新的 request_id 与 trace_id。
pub fn new_request_ids() -> RequestIds {
    RequestIds {
        request_id: uuid::Uuid::new_v4().to_string(),
        trace_id: uuid::Uuid::new_v4().to_string(),
    }
}

/// 记录一次成功的设备往返及其耗时（毫秒）。
pub fn record_device_command_sent(latency_ms: u64) {
    let metrics = metrics();
    metrics.device_commands_sent.fetch_add(1, Ordering::Relaxed);
    metrics
        .device_latency_ms_total
        .fetch_add(latency_ms, Ordering::Relaxed);
    metrics
        .device_latency_ms_count
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录设备指令失败（传输或协议错误）。
pub fn record_device_command_failed() {
    metrics()
        .device_commands_failed
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录注册表请求次数。
pub fn record_registry_request() {
    metrics().registry_requests.fetch_add(1, Ordering::Relaxed);
}

/// 记录注册表请求失败次数。
pub fn record_registry_failure() {
    metrics().registry_failures.fetch_add(1, Ordering::Relaxed);
}

/// 记录因请求期限到期而被拒绝的次数。
pub fn record_request_timed_out() {
    metrics().requests_timed_out.fetch_add(1, Ordering::Relaxed);
}

/// 记录备份成功。
pub fn record_backup_succeeded() {
    metrics().backups_succeeded.fetch_add(1, Ordering::Relaxed);
}

/// 记录备份失败。
pub fn record_backup_failed() {
    metrics().backups_failed.fetch_add(1, Ordering::Relaxed);
}

/// 记录保留策略删除的快照数量。
pub fn record_snapshots_pruned(count: u64) {
    metrics()
        .snapshots_pruned
        .fetch_add(count, Ordering::Relaxed);
}
