//! 逻辑请求与指令表
//!
//! 类别与注册表指令都用枚举表示，字符串只在解析时出现一次。

use crate::error::DispatchError;
use domain::DeviceKey;
use std::fmt;
use std::str::FromStr;

/// 请求类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    /// 下发到打印机
    Device,
    /// 注册表操作
    Registry,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Device => "device",
            Self::Registry => "registry",
        }
    }
}

impl FromStr for Category {
    type Err = DispatchError;

    /// 同时接受网关协议中的 `sendcmdtoprinter` / `requesttodb`。
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "device" | "sendcmdtoprinter" => Ok(Self::Device),
            "registry" | "requesttodb" => Ok(Self::Registry),
            _ => Err(DispatchError::UnknownCategory(value.to_string())),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 注册表指令
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistryCommand {
    GetOne,
    GetAll,
    PutOne,
    PutMany,
    Update,
    DeleteOne,
    DeleteAll,
}

impl RegistryCommand {
    pub const ALL: [RegistryCommand; 7] = [
        Self::GetOne,
        Self::GetAll,
        Self::PutOne,
        Self::PutMany,
        Self::Update,
        Self::DeleteOne,
        Self::DeleteAll,
    ];

    /// 网关协议中的指令名。
    pub fn name(self) -> &'static str {
        match self {
            Self::GetOne => "GetPrinter",
            Self::GetAll => "GetAllPrinters",
            Self::PutOne => "PutPrinter",
            Self::PutMany => "PutManyPrinters",
            Self::Update => "UpdPrinter",
            Self::DeleteOne => "DelPrinter",
            Self::DeleteAll => "RemoveAllPrinters",
        }
    }

    fn alias(self) -> &'static str {
        match self {
            Self::GetOne => "GetOne",
            Self::GetAll => "GetAll",
            Self::PutOne => "PutOne",
            Self::PutMany => "PutMany",
            Self::Update => "Update",
            Self::DeleteOne => "DeleteOne",
            Self::DeleteAll => "DeleteAll",
        }
    }

    /// 是否修改注册表。
    pub fn is_write(self) -> bool {
        !matches!(self, Self::GetOne | Self::GetAll)
    }
}

impl FromStr for RegistryCommand {
    type Err = DispatchError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let name = value.trim();
        if name.is_empty() {
            return Err(DispatchError::EmptyCommand);
        }
        Self::ALL
            .into_iter()
            .find(|command| {
                command.name().eq_ignore_ascii_case(name) || command.alias().eq_ignore_ascii_case(name)
            })
            .ok_or_else(|| DispatchError::UnknownRegistryCommand(name.to_string()))
    }
}

impl fmt::Display for RegistryCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 分发器的输入。
#[derive(Debug, Clone, Default)]
pub struct LogicalRequest {
    /// 类别名（`device` / `registry` 或其协议别名）
    pub category: String,
    pub command: String,
    pub body: String,
    /// 设备指令的目标打印机
    pub target: Option<DeviceKey>,
    /// 调用方声明的产线，仅用于错误信息
    pub line: Option<String>,
}

impl LogicalRequest {
    pub fn device(target: DeviceKey, command: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            category: Category::Device.as_str().to_string(),
            command: command.into(),
            body: body.into(),
            target: Some(target),
            line: None,
        }
    }

    pub fn registry(command: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            category: Category::Registry.as_str().to_string(),
            command: command.into(),
            body: body.into(),
            target: None,
            line: None,
        }
    }

    pub fn with_line(mut self, line: impl Into<String>) -> Self {
        self.line = Some(line.into());
        self
    }
}
