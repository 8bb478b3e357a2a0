//! 快照命名与备份目录扫描
//!
//! 快照名：`registry-<UTC yyyyMMddTHHmmss.SSSZ>-<seq>`，压缩时追加 `.zip`。
//! 保留列表只依赖目录内容即可重建，顺序按 seq（创建顺序），既不看字符串也不看时间戳。

use crate::error::BackupError;
use chrono::{DateTime, NaiveDateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

pub const SNAPSHOT_PREFIX: &str = "registry-";
pub const ARCHIVE_SUFFIX: &str = ".zip";
pub(crate) const STAGING_PREFIX: &str = ".staging-";
pub(crate) const PARTIAL_SUFFIX: &str = ".partial";

const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%S%.3f";

/// 已保留的快照。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotInfo {
    pub name: String,
    pub path: PathBuf,
    pub created: DateTime<Utc>,
    pub seq: u64,
    pub size_bytes: u64,
    pub compressed: bool,
}

impl SnapshotInfo {
    fn sort_key(&self) -> u64 {
        self.seq
    }
}

pub fn snapshot_name(created: DateTime<Utc>, seq: u64, compressed: bool) -> String {
    let suffix = if compressed { ARCHIVE_SUFFIX } else { "" };
    format!(
        "{SNAPSHOT_PREFIX}{}Z-{seq:04}{suffix}",
        created.format(TIMESTAMP_FORMAT)
    )
}

/// 解析快照名，返回 (创建时间, seq, 是否压缩)；不符合格式返回 `None`。
pub fn parse_snapshot_name(name: &str) -> Option<(DateTime<Utc>, u64, bool)> {
    let rest = name.strip_prefix(SNAPSHOT_PREFIX)?;
    let (rest, compressed) = match rest.strip_suffix(ARCHIVE_SUFFIX) {
        Some(rest) => (rest, true),
        None => (rest, false),
    };
    let (timestamp, seq) = rest.rsplit_once('-')?;
    if seq.len() < 4 || !seq.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    let seq = seq.parse::<u64>().ok()?;
    let timestamp = timestamp.strip_suffix('Z')?;
    let created = NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT)
        .ok()?
        .and_utc();
    Some((created, seq, compressed))
}

/// 清理上次中断留下的临时文件，并按创建顺序返回已有快照。
pub(crate) fn scan_backup_dir(dir: &Path) -> Result<Vec<SnapshotInfo>, BackupError> {
    let entries = fs::read_dir(dir).map_err(|err| BackupError::io("read", dir, err))?;
    let mut snapshots = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| BackupError::io("read", dir, err))?;
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        let file_type = entry
            .file_type()
            .map_err(|err| BackupError::io("stat", &path, err))?;

        if name.starts_with(STAGING_PREFIX) || name.ends_with(PARTIAL_SUFFIX) {
            remove_path(&path, file_type.is_dir())
                .map_err(|err| BackupError::io("remove", &path, err))?;
            warn!(target: "printcomm.backup", path = %path.display(), "stale_backup_leftover_removed");
            continue;
        }

        let Some((created, seq, compressed)) = parse_snapshot_name(&name) else {
            continue;
        };
        // 压缩快照是文件，未压缩快照是目录
        if compressed == file_type.is_dir() {
            continue;
        }
        let size_bytes = if compressed {
            entry
                .metadata()
                .map_err(|err| BackupError::io("stat", &path, err))?
                .len()
        } else {
            dir_size(&path)?
        };
        snapshots.push(SnapshotInfo {
            name,
            path,
            created,
            seq,
            size_bytes,
            compressed,
        });
    }
    snapshots.sort_by_key(SnapshotInfo::sort_key);
    Ok(snapshots)
}

pub(crate) fn dir_size(dir: &Path) -> Result<u64, BackupError> {
    let mut total = 0;
    for entry in walkdir::WalkDir::new(dir) {
        let entry = entry.map_err(|err| {
            let path = err.path().unwrap_or(dir).to_path_buf();
            BackupError::io("walk", path, err.into())
        })?;
        if entry.file_type().is_file() {
            total += entry
                .metadata()
                .map_err(|err| BackupError::io("stat", entry.path(), err.into()))?
                .len();
        }
    }
    Ok(total)
}

pub(crate) fn remove_path(path: &Path, is_dir: bool) -> std::io::Result<()> {
    if is_dir {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).single().unwrap()
    }

    #[test]
    fn name_format() {
        let created = at(1_760_870_400_123);
        assert_eq!(
            snapshot_name(created, 7, true),
            "registry-20251019T104000.123Z-0007.zip"
        );
        assert_eq!(
            snapshot_name(created, 12_345, false),
            "registry-20251019T104000.123Z-12345"
        );
    }

    #[test]
    fn names_parse_back() {
        let created = at(1_760_870_400_123);
        for (seq, compressed) in [(1, true), (42, false), (10_000, true)] {
            let name = snapshot_name(created, seq, compressed);
            assert_eq!(parse_snapshot_name(&name), Some((created, seq, compressed)));
        }
    }

    #[test]
    fn foreign_names_are_ignored() {
        for name in [
            "notes.txt",
            "registry-latest.zip",
            "registry-20251019T104000.123Z-7",
            "registry-20251019T104000.123-0007",
            "registry-2025-0007.zip",
        ] {
            assert_eq!(parse_snapshot_name(name), None, "{name}");
        }
    }
}
