//! 备份管理器
//!
//! 状态：`Stopped → Running → Stopped`。
//!
//! - 所有备份（定时、手动、退出前）都经过同一把 `tokio::sync::Mutex`，同一时刻最多执行一个
//! - 复制与压缩在 `spawn_blocking` 中完成，锁的 guard 随任务一起移入阻塞线程，
//!   调用方的 future 被丢弃时锁仍保持到复制结束
//! - 保留列表按 seq（创建顺序）维护，超出上限时从最旧的开始删除

use crate::archive::{copy_tree, zip_dir};
use crate::clock::{Clock, SystemClock};
use crate::error::{BackupError, SchedulerError};
use crate::schedule::parse_schedule;
use crate::snapshot::{
    ARCHIVE_SUFFIX, PARTIAL_SUFFIX, STAGING_PREFIX, SnapshotInfo, remove_path,
    scan_backup_dir, snapshot_name,
};
use printcomm_telemetry::{record_backup_failed, record_backup_succeeded, record_snapshots_pruned};
use std::collections::VecDeque;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::{OwnedMutexGuard, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

/// 备份配置。
#[derive(Debug, Clone)]
pub struct BackupConfig {
    /// 注册表所在目录（整个目录被复制）
    pub registry_dir: PathBuf,
    pub backup_dir: PathBuf,
    pub schedule: String,
    /// 保留的快照数，0 表示不限
    pub max_backups: usize,
    pub compress: bool,
    /// `stop()` 等待进行中备份的上限
    pub stop_grace: Duration,
}

impl BackupConfig {
    pub fn new(registry_dir: impl Into<PathBuf>, backup_dir: impl Into<PathBuf>) -> Self {
        Self {
            registry_dir: registry_dir.into(),
            backup_dir: backup_dir.into(),
            schedule: "@every 24h".to_string(),
            max_backups: 7,
            compress: true,
            stop_grace: Duration::from_secs(10),
        }
    }
}

#[derive(Clone)]
pub struct BackupManager {
    inner: Arc<BackupInner>,
}

struct BackupInner {
    config: BackupConfig,
    clock: Arc<dyn Clock>,
    backup_lock: Arc<tokio::sync::Mutex<()>>,
    retained: Mutex<VecDeque<SnapshotInfo>>,
    next_seq: AtomicU64,
    scheduler: Mutex<Option<SchedulerHandle>>,
}

struct SchedulerHandle {
    cancel: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl BackupManager {
    pub fn new(config: BackupConfig) -> Result<Self, BackupError> {
        Self::new_with_clock(config, Arc::new(SystemClock))
    }

    /// 创建备份目录，清理残留的临时文件，并从目录内容重建保留列表。
    pub fn new_with_clock(config: BackupConfig, clock: Arc<dyn Clock>) -> Result<Self, BackupError> {
        fs::create_dir_all(&config.backup_dir)
            .map_err(|err| BackupError::io("create", &config.backup_dir, err))?;
        let existing = scan_backup_dir(&config.backup_dir)?;
        let next_seq = existing.iter().map(|snapshot| snapshot.seq).max().unwrap_or(0) + 1;
        info!(
            target: "printcomm.backup",
            backup_dir = %config.backup_dir.display(),
            retained = existing.len(),
            next_seq = next_seq,
            "backup_manager_ready"
        );

        Ok(Self {
            inner: Arc::new(BackupInner {
                config,
                clock,
                backup_lock: Arc::new(tokio::sync::Mutex::new(())),
                retained: Mutex::new(existing.into()),
                next_seq: AtomicU64::new(next_seq),
                scheduler: Mutex::new(None),
            }),
        })
    }

    pub fn config(&self) -> &BackupConfig {
        &self.inner.config
    }

    /// 执行一次备份；已有备份在进行时排队等待。
    pub async fn perform_backup(&self) -> Result<SnapshotInfo, BackupError> {
        let guard = self.inner.backup_lock.clone().lock_owned().await;
        self.run_locked(guard).await
    }

    /// 执行一次备份；已有备份在进行时立即返回 `InProgress`。
    pub async fn try_perform_backup(&self) -> Result<SnapshotInfo, BackupError> {
        let guard = self
            .inner
            .backup_lock
            .clone()
            .try_lock_owned()
            .map_err(|_| BackupError::InProgress)?;
        self.run_locked(guard).await
    }

    /// 当前保留的快照（从旧到新）。
    pub fn list_snapshots(&self) -> Vec<SnapshotInfo> {
        match self.inner.retained.lock() {
            Ok(retained) => retained.iter().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().iter().cloned().collect(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner
            .scheduler
            .lock()
            .map(|scheduler| scheduler.is_some())
            .unwrap_or(false)
    }

    /// 启动定时备份。首次触发在启动后一个间隔。
    pub fn start_scheduled_backups(&self) -> Result<(), SchedulerError> {
        let mut scheduler = match self.inner.scheduler.lock() {
            Ok(scheduler) => scheduler,
            Err(poisoned) => poisoned.into_inner(),
        };
        if scheduler.is_some() {
            return Err(SchedulerError::AlreadyRunning);
        }
        let interval = parse_schedule(&self.inner.config.schedule)?;

        let (cancel, cancelled) = watch::channel(false);
        let task = tokio::spawn(run_schedule(self.clone(), interval, cancelled));
        *scheduler = Some(SchedulerHandle { cancel, task });
        info!(
            target: "printcomm.backup",
            schedule = %self.inner.config.schedule,
            interval_ms = interval.as_millis() as u64,
            "backup_schedule_started"
        );
        Ok(())
    }

    /// 停止定时备份，并在宽限期内等待进行中的备份完成。重复调用无副作用。
    pub async fn stop(&self) {
        let handle = match self.inner.scheduler.lock() {
            Ok(mut scheduler) => scheduler.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(handle) = &handle {
            let _ = handle.cancel.send(true);
        }

        let grace = self.inner.config.stop_grace;
        let wait = async {
            if let Some(handle) = handle {
                let _ = handle.task.await;
            }
            // 手动或退出前触发的备份同样需要等待
            let _guard = self.inner.backup_lock.lock().await;
        };
        match tokio::time::timeout(grace, wait).await {
            Ok(()) => info!(target: "printcomm.backup", "backup_schedule_stopped"),
            Err(_) => warn!(
                target: "printcomm.backup",
                grace_ms = grace.as_millis() as u64,
                "backup_stop_grace_exceeded"
            ),
        }
    }

    /// 在阻塞线程中执行备份；`guard` 在备份结束（含计数与日志）后才释放。
    async fn run_locked(&self, guard: OwnedMutexGuard<()>) -> Result<SnapshotInfo, BackupError> {
        let inner = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let started_at = Instant::now();
            let result = inner.backup_blocking();
            match &result {
                Ok(outcome) => {
                    record_backup_succeeded();
                    info!(
                        target: "printcomm.backup",
                        snapshot = %outcome.name,
                        size_bytes = outcome.size_bytes,
                        compressed = outcome.compressed,
                        elapsed_ms = started_at.elapsed().as_millis() as u64,
                        "backup_completed"
                    );
                }
                Err(err) => {
                    record_backup_failed();
                    warn!(target: "printcomm.backup", error = %err, "backup_failed");
                }
            }
            drop(guard);
            result
        })
        .await
        .map_err(|err| BackupError::Task(err.to_string()))
        .and_then(|result| result)
    }
}

impl BackupInner {
    fn backup_blocking(&self) -> Result<SnapshotInfo, BackupError> {
        let config = &self.config;
        if !config.registry_dir.is_dir() {
            return Err(BackupError::SourceMissing(config.registry_dir.clone()));
        }

        let created = self.clock.now();
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        let name = snapshot_name(created, seq, config.compress);
        let staging = config.backup_dir.join(format!("{STAGING_PREFIX}{name}"));
        let path = config.backup_dir.join(&name);

        let staged = copy_tree(&config.registry_dir, &staging).and_then(|copied| {
            if config.compress {
                let partial = config.backup_dir.join(format!("{name}{PARTIAL_SUFFIX}"));
                let size = zip_dir(&staging, &partial)?;
                fs::rename(&partial, &path).map_err(|err| BackupError::io("rename", &partial, err))?;
                fs::remove_dir_all(&staging)
                    .map_err(|err| BackupError::io("remove", &staging, err))?;
                Ok(size)
            } else {
                fs::rename(&staging, &path).map_err(|err| BackupError::io("rename", &staging, err))?;
                Ok(copied)
            }
        });
        let size_bytes = match staged {
            Ok(size) => size,
            Err(err) => {
                let _ = fs::remove_dir_all(&staging);
                let _ = fs::remove_file(config.backup_dir.join(format!("{name}{PARTIAL_SUFFIX}")));
                return Err(err);
            }
        };

        let snapshot = SnapshotInfo {
            name,
            path,
            created,
            seq,
            size_bytes,
            compressed: config.compress,
        };
        self.retain(snapshot.clone())?;
        Ok(snapshot)
    }

    /// 追加到保留列表并按上限删除最旧的快照。删除失败的快照留在列表中，下次再试。
    fn retain(&self, snapshot: SnapshotInfo) -> Result<(), BackupError> {
        let mut retained = match self.retained.lock() {
            Ok(retained) => retained,
            Err(poisoned) => poisoned.into_inner(),
        };
        retained.push_back(snapshot);
        // seq 单调递增，不受墙钟回拨影响
        retained.make_contiguous().sort_by_key(|snapshot| snapshot.seq);

        let limit = self.config.max_backups;
        if limit == 0 {
            return Ok(());
        }
        let mut pruned = 0u64;
        while retained.len() > limit {
            let Some(oldest) = retained.front() else {
                break;
            };
            let is_dir = !oldest.name.ends_with(ARCHIVE_SUFFIX);
            match remove_path(&oldest.path, is_dir) {
                Ok(()) => {}
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(source) => {
                    record_snapshots_pruned(pruned);
                    return Err(BackupError::Prune {
                        name: oldest.name.clone(),
                        source,
                    });
                }
            }
            if let Some(removed) = retained.pop_front() {
                info!(target: "printcomm.backup", snapshot = %removed.name, "snapshot_pruned");
            }
            pruned += 1;
        }
        record_snapshots_pruned(pruned);
        Ok(())
    }
}

async fn run_schedule(manager: BackupManager, interval: Duration, mut cancelled: watch::Receiver<bool>) {
    let start = tokio::time::Instant::now() + interval;
    let mut ticker = tokio::time::interval_at(start, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                // 单次失败已在 run_locked 中记录，调度继续
                let _ = manager.perform_backup().await;
            }
            changed = cancelled.changed() => {
                if changed.is_err() || *cancelled.borrow() {
                    break;
                }
            }
        }
    }
}
