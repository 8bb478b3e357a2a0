//! 打印网关 HTTP 边界层：请求解析、错误码映射、请求追踪 ID。
//!
//! 进程生命周期（信号、启动顺序）在 `main.rs` 中。

pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod utils;

use axum::Router;
use printcomm_backup::BackupManager;
use printcomm_dispatch::Dispatcher;
use std::time::Duration;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Dispatcher,
    pub backup: BackupManager,
    /// 单个请求从到达起的处理期限
    pub request_timeout: Duration,
}

/// 组装路由与中间件。
pub fn build_app(state: AppState) -> Router {
    routes::create_router()
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        // 注入 request_id/trace_id 与到达时间
        .layer(axum::middleware::from_fn(middleware::request_context))
}
