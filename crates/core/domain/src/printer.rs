//! 打印机记录与生命周期状态。

use crate::{DomainError, validate_line, validate_uid};
use serde::{Deserialize, Serialize};

/// 打印机生命周期状态。
///
/// 只有 `InTheWork` 的设备允许下发指令。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrinterStatus {
    /// 在产线上工作
    InTheWork,
    /// 空闲备用
    #[default]
    Idle,
    /// 已停用
    Disabled,
    /// 维修中
    UnderRepair,
    /// 已报废
    Decommissioned,
}

impl PrinterStatus {
    pub fn is_dispatchable(self) -> bool {
        matches!(self, Self::InTheWork)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::InTheWork => "in_the_work",
            Self::Idle => "idle",
            Self::Disabled => "disabled",
            Self::UnderRepair => "under_repair",
            Self::Decommissioned => "decommissioned",
        }
    }
}


impl std::fmt::Display for PrinterStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 已入库的打印机记录。
///
/// `id` 与 `uid` 创建后不可变，删除后也不会被复用。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrinterRecord {
    pub id: u64,
    pub uid: String,
    pub name: String,
    pub ip: String,
    pub port: u16,
    #[serde(default)]
    pub status: PrinterStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl PrinterRecord {
    /// 设备网络地址（host:port）。
    pub fn address(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }
}

/// 新增打印机的输入；`uid` 缺省时由存储层生成。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPrinter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    pub name: String,
    pub ip: String,
    pub port: u16,
    #[serde(default)]
    pub status: PrinterStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl NewPrinter {
    /// 绑定身份，转换为完整记录。
    pub fn into_record(self, id: u64, uid: String) -> PrinterRecord {
        PrinterRecord {
            id,
            uid,
            name: self.name,
            ip: self.ip,
            port: self.port,
            status: self.status,
            line: self.line,
            description: self.description,
        }
    }
}

fn validate_fields(
    name: &str,
    ip: &str,
    port: u16,
    line: Option<&str>,
) -> Result<(), DomainError> {
    if name.trim().is_empty() {
        return Err(DomainError::Required("name"));
    }
    if ip.trim().is_empty() {
        return Err(DomainError::Required("ip"));
    }
    if port == 0 {
        return Err(DomainError::Required("port"));
    }
    if let Some(line) = line {
        validate_line(line)?;
    }
    Ok(())
}

/// 校验新增输入。
pub fn validate_new_printer(printer: &NewPrinter) -> Result<(), DomainError> {
    if let Some(uid) = printer.uid.as_deref() {
        validate_uid(uid)?;
    }
    validate_fields(&printer.name, &printer.ip, printer.port, printer.line.as_deref())
}

/// 校验整条记录（用于更新）。
pub fn validate_record(record: &PrinterRecord) -> Result<(), DomainError> {
    if record.id == 0 {
        return Err(DomainError::Required("id"));
    }
    validate_uid(&record.uid)?;
    validate_fields(&record.name, &record.ip, record.port, record.line.as_deref())
}
