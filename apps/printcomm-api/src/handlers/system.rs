//! 系统 handlers
//!
//! - GET /
//! - GET /health
//! - GET /metrics

use crate::utils::response::method_not_allowed_error;
use api_contract::ApiResponse;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use printcomm_telemetry::metrics;

pub async fn home() -> Response {
    (
        StatusCode::OK,
        Json(ApiResponse::success(
            "printcomm gateway: POST a command to / to talk to printers or the registry",
        )),
    )
        .into_response()
}

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "ok": true }))
}

pub async fn get_metrics() -> Response {
    (StatusCode::OK, Json(ApiResponse::success(metrics().snapshot()))).into_response()
}

pub async fn method_not_allowed() -> Response {
    method_not_allowed_error()
}
