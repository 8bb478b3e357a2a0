//! 目录复制与 zip 打包

use crate::error::BackupError;
use std::fs::{self, File};
use std::io;
use std::path::Path;
use walkdir::{DirEntry, WalkDir};
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// 注册表写入中的临时文件不进入快照
const SKIPPED_SUFFIX: &str = ".tmp";

fn is_skipped(entry: &DirEntry) -> bool {
    if entry.depth() == 0 {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || name.ends_with(SKIPPED_SUFFIX)
}

/// 将 `src` 目录树复制到 `dst`（`dst` 需不存在）。返回复制的字节数。
pub(crate) fn copy_tree(src: &Path, dst: &Path) -> Result<u64, BackupError> {
    fs::create_dir_all(dst).map_err(|err| BackupError::io("create", dst, err))?;
    let mut copied = 0;
    for entry in WalkDir::new(src).into_iter().filter_entry(|entry| !is_skipped(entry)) {
        let entry = entry.map_err(|err| BackupError::io("walk", src, err.into()))?;
        let Ok(relative) = entry.path().strip_prefix(src) else {
            continue;
        };
        if relative.as_os_str().is_empty() {
            continue;
        }
        let target = dst.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|err| BackupError::io("create", &target, err))?;
        } else if entry.file_type().is_file() {
            copied += fs::copy(entry.path(), &target)
                .map_err(|err| BackupError::io("copy", entry.path(), err))?;
        }
    }
    Ok(copied)
}

/// 将 `src` 目录打包为 `dst`（Deflate），写完后 fsync。
pub(crate) fn zip_dir(src: &Path, dst: &Path) -> Result<u64, BackupError> {
    let file = File::create(dst).map_err(|err| BackupError::io("create", dst, err))?;
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let compress_err = |source: zip::result::ZipError| BackupError::Compress {
        path: dst.to_path_buf(),
        source,
    };

    for entry in WalkDir::new(src).sort_by_file_name() {
        let entry = entry.map_err(|err| BackupError::io("walk", src, err.into()))?;
        let Ok(relative) = entry.path().strip_prefix(src) else {
            continue;
        };
        if relative.as_os_str().is_empty() {
            continue;
        }
        // zip 内统一使用 `/` 分隔
        let name = relative
            .components()
            .map(|part| part.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        if entry.file_type().is_dir() {
            writer
                .add_directory(name, options)
                .map_err(compress_err)?;
        } else if entry.file_type().is_file() {
            writer.start_file(name, options).map_err(compress_err)?;
            let mut input =
                File::open(entry.path()).map_err(|err| BackupError::io("open", entry.path(), err))?;
            io::copy(&mut input, &mut writer)
                .map_err(|err| BackupError::io("compress", entry.path(), err))?;
        }
    }

    let file = writer.finish().map_err(compress_err)?;
    file.sync_all()
        .map_err(|err| BackupError::io("sync", dst, err))?;
    let size = file
        .metadata()
        .map_err(|err| BackupError::io("stat", dst, err))?
        .len();
    Ok(size)
}
