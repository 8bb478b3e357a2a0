//! 网关共享的领域模型：打印机记录、状态与寻址方式。

pub mod printer;

pub use printer::{NewPrinter, PrinterRecord, PrinterStatus, validate_new_printer, validate_record};

/// uid 的规范长度（带连字符的 UUID 文本）。
pub const UID_LEN: usize = 36;

/// 产线标识的最大长度。
pub const LINE_MAX_LEN: usize = 9;

/// 错误分类，边界层据此映射响应码。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    NotFound,
    DeviceNotReady,
    Protocol,
    Transport,
    Store,
    Backup,
    Scheduler,
    Timeout,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::DeviceNotReady => "device_not_ready",
            Self::Protocol => "protocol",
            Self::Transport => "transport",
            Self::Store => "store",
            Self::Backup => "backup",
            Self::Scheduler => "scheduler",
            Self::Timeout => "timeout",
        }
    }
}

/// 领域层校验错误。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// uid 与 id 同时给出或都未给出。
    #[error("exactly one of 'uid' or 'id' must be provided")]
    AmbiguousIdentifier,
    #[error("invalid uid '{0}': expected a 36-char uuid")]
    InvalidUid(String),
    #[error("line designator '{0}' exceeds 9 chars")]
    LineTooLong(String),
    #[error("{0} required")]
    Required(&'static str),
}

/// 打印机寻址方式：按 uid 或按数值 id，二者择一。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DeviceKey {
    ByUid(String),
    ById(u64),
}

impl DeviceKey {
    /// 从边界层的可选字段构造寻址键。
    ///
    /// 空字符串视为未提供，`0` 视为未提供；恰好一个有效时返回对应键。
    pub fn from_parts(uid: Option<&str>, id: Option<u64>) -> Result<Self, DomainError> {
        let uid = uid.map(str::trim).filter(|value| !value.is_empty());
        let id = id.filter(|value| *value != 0);
        match (uid, id) {
            (Some(uid), None) => {
                validate_uid(uid)?;
                Ok(Self::ByUid(uid.to_string()))
            }
            (None, Some(id)) => Ok(Self::ById(id)),
            _ => Err(DomainError::AmbiguousIdentifier),
        }
    }

    /// 判断记录是否被该键命中。
    pub fn matches(&self, record: &PrinterRecord) -> bool {
        match self {
            Self::ByUid(uid) => record.uid.eq_ignore_ascii_case(uid),
            Self::ById(id) => record.id == *id,
        }
    }
}

impl std::fmt::Display for DeviceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ByUid(uid) => write!(f, "uid={uid}"),
            Self::ById(id) => write!(f, "id={id}"),
        }
    }
}

/// 校验 uid 为规范的 36 位 UUID 文本。
pub fn validate_uid(uid: &str) -> Result<(), DomainError> {
    if uid.len() != UID_LEN || uuid::Uuid::parse_str(uid).is_err() {
        return Err(DomainError::InvalidUid(uid.to_string()));
    }
    Ok(())
}

/// 校验产线标识长度（按字符计）。
pub fn validate_line(line: &str) -> Result<(), DomainError> {
    if line.chars().count() > LINE_MAX_LEN {
        return Err(DomainError::LineTooLong(line.to_string()));
    }
    Ok(())
}

/// 生成新的 uid。
pub fn new_uid() -> String {
    uuid::Uuid::new_v4().to_string()
}
