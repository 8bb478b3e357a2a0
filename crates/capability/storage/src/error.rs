//! 存储层错误类型
//!
//! 定义统一的存储错误类型，用于封装底层错误：
//! - 记录不存在
//! - 身份冲突（uid 重复或已退役）
//! - 字段校验失败
//! - 文件读写错误

use domain::DomainError;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("printer not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid printer: {0}")]
    Invalid(#[from] DomainError),

    #[error("store io error: {0}")]
    Io(String),
}

impl StoreError {
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io(message.into())
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Io(format!("registry file corrupted: {err}"))
    }
}
