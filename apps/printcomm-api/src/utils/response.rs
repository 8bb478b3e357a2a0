//! HTTP 响应辅助函数和 DTO 转换
//!
//! 错误分类（`ErrorKind`）到状态码与错误码的映射集中在这里：
//! - 调用方错误（校验、不存在、设备未就绪、编码失败）→ 4xx
//! - 请求期限到期 → 408
//! - 设备、存储、备份故障 → 5xx

use api_contract::{ApiResponse, SnapshotDto, codes};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use domain::{DomainError, ErrorKind};
use printcomm_backup::{BackupError, SnapshotInfo};
use printcomm_dispatch::{DispatchError, Stage};

fn error_response(status: StatusCode, code: &str, message: impl Into<String>) -> Response {
    (status, Json(ApiResponse::<()>::error(code, message.into()))).into_response()
}

/// 错误请求响应
pub fn bad_request_error(message: impl Into<String>) -> Response {
    error_response(StatusCode::BAD_REQUEST, codes::INVALID_REQUEST, message)
}

pub fn validation_error(err: DomainError) -> Response {
    bad_request_error(err.to_string())
}

pub fn method_not_allowed_error() -> Response {
    error_response(
        StatusCode::METHOD_NOT_ALLOWED,
        codes::METHOD_NOT_ALLOWED,
        "method not allowed",
    )
}

pub fn timeout_error() -> Response {
    error_response(
        StatusCode::REQUEST_TIMEOUT,
        codes::REQUEST_TIMEOUT,
        "request deadline exceeded",
    )
}

/// 分发错误响应
pub fn dispatch_error(err: DispatchError) -> Response {
    let message = err.to_string();
    let (status, code) = match err.kind() {
        ErrorKind::Validation => (StatusCode::BAD_REQUEST, codes::INVALID_REQUEST),
        ErrorKind::NotFound => (StatusCode::NOT_FOUND, codes::NOT_FOUND),
        ErrorKind::DeviceNotReady => (StatusCode::CONFLICT, codes::DEVICE_NOT_READY),
        ErrorKind::Protocol if err.stage() == Stage::Encode => {
            (StatusCode::BAD_REQUEST, codes::PROTOCOL_ERROR)
        }
        ErrorKind::Protocol => (StatusCode::BAD_GATEWAY, codes::PROTOCOL_ERROR),
        ErrorKind::Transport => (StatusCode::BAD_GATEWAY, codes::TRANSPORT_ERROR),
        ErrorKind::Timeout => return timeout_error(),
        ErrorKind::Store => (StatusCode::INTERNAL_SERVER_ERROR, codes::STORE_ERROR),
        ErrorKind::Backup | ErrorKind::Scheduler => {
            (StatusCode::INTERNAL_SERVER_ERROR, codes::INTERNAL)
        }
    };
    error_response(status, code, message)
}

/// 备份错误响应
pub fn backup_error(err: BackupError) -> Response {
    match err {
        BackupError::InProgress => {
            error_response(StatusCode::CONFLICT, codes::BACKUP_IN_PROGRESS, err.to_string())
        }
        err => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            codes::BACKUP_ERROR,
            err.to_string(),
        ),
    }
}

/// SnapshotInfo 转 SnapshotDto
pub fn snapshot_to_dto(snapshot: SnapshotInfo) -> SnapshotDto {
    SnapshotDto {
        name: snapshot.name,
        size_bytes: snapshot.size_bytes,
        created_at_ms: snapshot.created.timestamp_millis(),
        compressed: snapshot.compressed,
    }
}
