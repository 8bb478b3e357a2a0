//! 分发错误类型
//!
//! 下层错误原样包装，并标注出错的阶段。

use domain::{DomainError, ErrorKind, PrinterStatus};
use printcomm_protocol::{CodecError, TransportError};
use printcomm_storage::StoreError;
use std::fmt;

/// 分发流程中的阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validate,
    Lookup,
    Encode,
    Send,
    Decode,
    Registry,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validate => "validate",
            Self::Lookup => "lookup",
            Self::Encode => "encode",
            Self::Send => "send",
            Self::Decode => "decode",
            Self::Registry => "registry",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("unknown category: '{0}'")]
    UnknownCategory(String),

    #[error("command name required")]
    EmptyCommand,

    #[error("unknown registry command: '{0}'")]
    UnknownRegistryCommand(String),

    #[error("{0}")]
    Invalid(#[from] DomainError),

    #[error("invalid body for {command}: {reason}")]
    InvalidBody { command: String, reason: String },

    #[error("printer not found: {0}")]
    DeviceNotFound(String),

    #[error("printer {target} is not in work (status: {status}){}", line_suffix(.line))]
    DeviceNotReady {
        target: String,
        status: PrinterStatus,
        line: Option<String>,
    },

    #[error("{stage} failed: {source}")]
    Protocol {
        stage: Stage,
        #[source]
        source: CodecError,
    },

    #[error("send failed: {0}")]
    Transport(#[source] TransportError),

    #[error("{stage} failed: {source}")]
    Store {
        stage: Stage,
        #[source]
        source: StoreError,
    },

    #[error("request deadline exceeded")]
    DeadlineExceeded,
}

fn line_suffix(line: &Option<String>) -> String {
    match line {
        Some(line) => format!(" for line {line}"),
        None => String::new(),
    }
}

impl DispatchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownCategory(_)
            | Self::EmptyCommand
            | Self::UnknownRegistryCommand(_)
            | Self::Invalid(_)
            | Self::InvalidBody { .. } => ErrorKind::Validation,
            Self::DeviceNotFound(_) => ErrorKind::NotFound,
            Self::DeviceNotReady { .. } => ErrorKind::DeviceNotReady,
            Self::Protocol { .. } => ErrorKind::Protocol,
            Self::Transport(_) => ErrorKind::Transport,
            Self::Store { source, .. } => match source {
                StoreError::NotFound(_) => ErrorKind::NotFound,
                StoreError::Invalid(_) | StoreError::Conflict(_) => ErrorKind::Validation,
                StoreError::Io(_) => ErrorKind::Store,
            },
            Self::DeadlineExceeded => ErrorKind::Timeout,
        }
    }

    /// 出错的阶段。
    pub fn stage(&self) -> Stage {
        match self {
            Self::UnknownCategory(_)
            | Self::EmptyCommand
            | Self::UnknownRegistryCommand(_)
            | Self::Invalid(_)
            | Self::InvalidBody { .. }
            | Self::DeadlineExceeded => Stage::Validate,
            Self::DeviceNotFound(_) | Self::DeviceNotReady { .. } => Stage::Lookup,
            Self::Protocol { stage, .. } | Self::Store { stage, .. } => *stage,
            Self::Transport(_) => Stage::Send,
        }
    }

    /// 是否属于调用方错误（边界层映射为 4xx）。
    pub fn is_client_error(&self) -> bool {
        match self.kind() {
            ErrorKind::Validation | ErrorKind::NotFound | ErrorKind::DeviceNotReady => true,
            ErrorKind::Protocol => self.stage() == Stage::Encode,
            _ => false,
        }
    }
}
