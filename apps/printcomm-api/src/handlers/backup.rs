//! 备份 handlers
//!
//! - POST /backup（`?nowait=true` 时若已有备份在执行立即返回 409）
//! - GET /backups

use crate::AppState;
use crate::utils::response::{backup_error, snapshot_to_dto};
use api_contract::{ApiResponse, BackupQuery, SnapshotDto};
use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::info;

/// 手动触发备份
pub async fn create_backup(
    State(state): State<AppState>,
    Query(query): Query<BackupQuery>,
) -> Response {
    info!(target: "printcomm.backup", nowait = query.nowait, "manual_backup_requested");
    let result = if query.nowait {
        state.backup.try_perform_backup().await
    } else {
        state.backup.perform_backup().await
    };
    match result {
        Ok(snapshot) => (
            StatusCode::OK,
            Json(ApiResponse::success(snapshot_to_dto(snapshot))),
        )
            .into_response(),
        Err(err) => backup_error(err),
    }
}

/// 列出保留的快照（从旧到新）
pub async fn list_backups(State(state): State<AppState>) -> Response {
    let data: Vec<SnapshotDto> = state
        .backup
        .list_snapshots()
        .into_iter()
        .map(snapshot_to_dto)
        .collect();
    (StatusCode::OK, Json(ApiResponse::success(data))).into_response()
}
