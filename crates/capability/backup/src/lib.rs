//! # 注册表备份模块
//!
//! 按计划（以及手动触发、进程退出前）复制注册表目录，可选 zip 压缩，
//! 写入备份目录并按数量保留最新的快照。
//!
//! 本模块只依赖注册表的目录位置，不调用存储接口：复制期间在线读写不受影响，
//! 快照最多落后一次进行中的写入。
//!
//! ## 使用示例
//!
//! ```rust,ignore
//! let manager = BackupManager::new(BackupConfig::new("./data/registry", "./data/backups"))?;
//! manager.start_scheduled_backups()?;
//! let snapshot = manager.perform_backup().await?;
//! manager.stop().await;
//! ```

mod archive;
mod clock;
mod error;
mod manager;
mod schedule;
mod snapshot;

pub use clock::{Clock, SystemClock};
pub use error::{BackupError, SchedulerError};
pub use manager::{BackupConfig, BackupManager};
pub use schedule::parse_schedule;
pub use snapshot::{ARCHIVE_SUFFIX, SNAPSHOT_PREFIX, SnapshotInfo, parse_snapshot_name, snapshot_name};
