//! 路由定义
//!
//! - 网关指令：GET / 与 POST /
//! - 健康检查：/health
//! - 备份：POST /backup，GET /backups
//! - 指标：/metrics

use super::AppState;
use super::handlers::*;
use axum::{
    Router,
    routing::{get, post},
};

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(home)
                .post(handle_command)
                .fallback(method_not_allowed),
        )
        .route("/health", get(health))
        .route("/backup", post(create_backup).fallback(method_not_allowed))
        .route("/backups", get(list_backups))
        .route("/metrics", get(get_metrics))
}
