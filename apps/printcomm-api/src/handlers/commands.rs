//! 网关指令 handler
//!
//! - POST /：`{ cmdtype, cmdname, cmdbody, uidline?, id?, rmline? }`

use crate::AppState;
use crate::middleware::RequestStart;
use crate::utils::response::{bad_request_error, dispatch_error, timeout_error, validation_error};
use api_contract::{ApiResponse, GatewayCommandRequest};
use axum::{
    Extension, Json,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use domain::{DeviceKey, DomainError, validate_line};
use printcomm_dispatch::{Category, LogicalRequest};
use printcomm_telemetry::record_request_timed_out;
use tokio::time::Instant;

/// 处理网关指令
pub async fn handle_command(
    State(state): State<AppState>,
    start: Option<Extension<RequestStart>>,
    body: Bytes,
) -> Response {
    let started_at = start.map(|Extension(start)| start.0).unwrap_or_else(Instant::now);
    let deadline = started_at + state.request_timeout;

    let req: GatewayCommandRequest = match serde_json::from_slice(&body) {
        Ok(req) => req,
        Err(err) => return bad_request_error(format!("invalid request body: {err}")),
    };
    let request = match to_logical_request(req) {
        Ok(request) => request,
        Err(response) => return response,
    };

    // 期限在读取请求体时就可能已经耗尽
    if Instant::now() >= deadline {
        record_request_timed_out();
        return timeout_error();
    }
    match state.dispatcher.dispatch_with_deadline(request, deadline).await {
        Ok(outcome) => (StatusCode::OK, Json(ApiResponse::success(outcome))).into_response(),
        Err(err) => dispatch_error(err),
    }
}

/// 边界校验：uid 长度、产线长度、寻址字段二选一。
fn to_logical_request(req: GatewayCommandRequest) -> Result<LogicalRequest, Response> {
    let category: Category = req
        .cmdtype
        .parse()
        .map_err(|err: printcomm_dispatch::DispatchError| bad_request_error(err.to_string()))?;

    let line = req
        .rmline
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty());
    if let Some(line) = line.as_deref() {
        validate_line(line).map_err(validation_error)?;
    }

    let uid = req.uidline.as_deref().map(str::trim).filter(|uid| !uid.is_empty());
    let id = req.id.filter(|id| *id != 0);
    let target = match (category, uid, id) {
        // 注册表请求的目标在指令体中，请求级寻址字段可省略
        (Category::Registry, None, None) => None,
        _ => Some(DeviceKey::from_parts(uid, id).map_err(validation_error)?),
    };
    if category == Category::Device && target.is_none() {
        return Err(validation_error(DomainError::AmbiguousIdentifier));
    }

    Ok(LogicalRequest {
        category: req.cmdtype,
        command: req.cmdname,
        body: req.cmdbody,
        target,
        line,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(cmdtype: &str, uid: Option<&str>, id: Option<u64>) -> GatewayCommandRequest {
        GatewayCommandRequest {
            cmdtype: cmdtype.to_string(),
            cmdname: "GET_STATUS".to_string(),
            cmdbody: String::new(),
            uidline: uid.map(str::to_string),
            id,
            rmline: None,
        }
    }

    #[test]
    fn device_request_needs_exactly_one_identifier() {
        assert!(to_logical_request(request("sendcmdtoprinter", None, None)).is_err());
        assert!(
            to_logical_request(request(
                "sendcmdtoprinter",
                Some("0f8fad5b-d9cb-469f-a165-70867728950e"),
                Some(3)
            ))
            .is_err()
        );
        let ok = to_logical_request(request("sendcmdtoprinter", None, Some(3))).unwrap();
        assert_eq!(ok.target, Some(DeviceKey::ById(3)));
    }

    #[test]
    fn short_uid_is_rejected() {
        assert!(to_logical_request(request("sendcmdtoprinter", Some("abc"), None)).is_err());
    }

    #[test]
    fn registry_request_may_omit_identifier() {
        let ok = to_logical_request(request("requesttodb", None, None)).unwrap();
        assert_eq!(ok.target, None);
    }

    #[test]
    fn long_line_is_rejected() {
        let mut req = request("requesttodb", None, None);
        req.rmline = Some("0123456789".to_string());
        assert!(to_logical_request(req).is_err());
    }
}
