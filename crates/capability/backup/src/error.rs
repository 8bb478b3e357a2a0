//! 备份错误类型

use domain::ErrorKind;
use std::io;
use std::path::PathBuf;

/// 单次备份失败。调度器记录后继续运行。
#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    #[error("backup already in progress")]
    InProgress,

    #[error("registry directory {0} not found")]
    SourceMissing(PathBuf),

    #[error("{op} {path}: {source}")]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("compress {path}: {source}")]
    Compress {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("prune {name}: {source}")]
    Prune {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("backup task aborted: {0}")]
    Task(String),
}

impl BackupError {
    pub(crate) fn io(op: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            op,
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Backup
    }
}

/// 调度器错误，直接返回给 `start_scheduled_backups` 的调用方。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchedulerError {
    #[error("backup scheduler already running")]
    AlreadyRunning,

    #[error("invalid backup schedule '{expr}': {reason}")]
    InvalidSchedule { expr: String, reason: String },
}

impl SchedulerError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Scheduler
    }
}
