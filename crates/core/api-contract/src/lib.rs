//! 稳定的 DTO 与 API 响应契约。

use serde::{Deserialize, Serialize};

/// 错误码（与 HTTP 状态码一一对应，由边界层映射）。
pub mod codes {
    pub const INVALID_REQUEST: &str = "INVALID.REQUEST";
    pub const NOT_FOUND: &str = "RESOURCE.NOT_FOUND";
    pub const DEVICE_NOT_READY: &str = "DEVICE.NOT_READY";
    pub const PROTOCOL_ERROR: &str = "DEVICE.PROTOCOL";
    pub const TRANSPORT_ERROR: &str = "DEVICE.TRANSPORT";
    pub const STORE_ERROR: &str = "STORE.ERROR";
    pub const BACKUP_ERROR: &str = "BACKUP.ERROR";
    pub const BACKUP_IN_PROGRESS: &str = "BACKUP.IN_PROGRESS";
    pub const REQUEST_TIMEOUT: &str = "REQUEST.TIMEOUT";
    pub const METHOD_NOT_ALLOWED: &str = "METHOD.NOT_ALLOWED";
    pub const INTERNAL: &str = "INTERNAL.ERROR";
}

/// 标准 API 响应封装。
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

/// 失败响应的错误体。
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ApiError {
                code: code.into(),
                message: message.into(),
            }),
        }
    }
}

/// 网关指令请求体（POST /）。
///
/// `cmdtype` 为 `sendcmdtoprinter` 时指向设备，为 `requesttodb` 时指向注册表。
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewayCommandRequest {
    #[serde(alias = "cmdType")]
    pub cmdtype: String,
    #[serde(default, alias = "cmdName")]
    pub cmdname: String,
    #[serde(default, alias = "cmdBody")]
    pub cmdbody: String,
    /// 目标打印机 uid（36 位）
    #[serde(default, alias = "uidLine")]
    pub uidline: Option<String>,
    /// 目标打印机数值 id
    #[serde(default)]
    pub id: Option<u64>,
    /// 产线标识（最长 9 个字符），仅用于错误信息
    #[serde(default, alias = "rmLine")]
    pub rmline: Option<String>,
}

/// 备份快照返回结构。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotDto {
    pub name: String,
    pub size_bytes: u64,
    pub created_at_ms: i64,
    pub compressed: bool,
}

/// 手动备份查询参数。
#[derive(Debug, Default, Deserialize)]
pub struct BackupQuery {
    /// 为 true 时若已有备份在执行则立即失败，否则排队等待
    #[serde(default)]
    pub nowait: bool,
}
