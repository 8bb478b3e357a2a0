//! 基于目录的打印机注册表
//!
//! 注册表整体保存在 `<dir>/printers.json` 中，读请求只访问内存副本。
//! 写请求串行执行：复制状态 → 修改 → 写入 `printers.json.tmp` → fsync → 原子 rename →
//! 替换内存状态。落盘失败时内存状态不变，目录中始终是一份完整的注册表文件。
//!
//! 备份模块直接复制该目录，因此目录中除注册表文件外不存放其他持久状态。

use crate::error::StoreError;
use crate::state::{RegistryFile, RegistryState};
use crate::traits::PrinterStore;
use domain::{DeviceKey, NewPrinter, PrinterRecord};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// 注册表文件名
pub const REGISTRY_FILE: &str = "printers.json";

/// 写入过程中使用的临时文件后缀
pub const TEMP_SUFFIX: &str = ".tmp";

#[derive(Clone)]
pub struct FilePrinterStore {
    inner: Arc<FileStoreInner>,
}

struct FileStoreInner {
    dir: PathBuf,
    path: PathBuf,
    state: RwLock<RegistryState>,
    write_lock: Mutex<()>,
}

impl FilePrinterStore {
    /// 打开（必要时创建）注册表目录。
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|err| StoreError::io(format!("create {}: {err}", dir.display())))?;

        let path = dir.join(REGISTRY_FILE);
        let tmp = temp_path(&path);
        if tokio::fs::try_exists(&tmp).await? {
            warn!(target: "printcomm.storage", path = %tmp.display(), "stale_registry_tmp_removed");
            tokio::fs::remove_file(&tmp).await?;
        }

        let state = if tokio::fs::try_exists(&path).await? {
            let bytes = tokio::fs::read(&path).await?;
            let file: RegistryFile = serde_json::from_slice(&bytes)?;
            RegistryState::from_file(file)?
        } else {
            let state = RegistryState::default();
            persist(&path, &state).await?;
            state
        };
        info!(
            target: "printcomm.storage",
            dir = %dir.display(),
            printers = state.len(),
            "registry_opened"
        );

        Ok(Self {
            inner: Arc::new(FileStoreInner {
                dir,
                path,
                state: RwLock::new(state),
                write_lock: Mutex::new(()),
            }),
        })
    }

    /// 注册表所在目录。
    pub fn dir(&self) -> &Path {
        &self.inner.dir
    }

    fn read<T>(&self, f: impl FnOnce(&RegistryState) -> T) -> Result<T, StoreError> {
        let state = self
            .inner
            .state
            .read()
            .map_err(|_| StoreError::io("lock poisoned"))?;
        Ok(f(&state))
    }

    async fn write<T>(
        &self,
        f: impl FnOnce(&mut RegistryState) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let _guard = self.inner.write_lock.lock().await;
        let mut draft = self.read(RegistryState::clone)?;
        let result = f(&mut draft)?;
        persist(&self.inner.path, &draft).await?;
        let mut state = self
            .inner
            .state
            .write()
            .map_err(|_| StoreError::io("lock poisoned"))?;
        *state = draft;
        Ok(result)
    }
}

#[async_trait::async_trait]
impl PrinterStore for FilePrinterStore {
    async fn get_one(&self, key: &DeviceKey) -> Result<PrinterRecord, StoreError> {
        self.read(|state| state.get(key))?
    }

    async fn get_all(&self) -> Result<Vec<PrinterRecord>, StoreError> {
        self.read(RegistryState::all)
    }

    async fn put_one(&self, printer: NewPrinter) -> Result<PrinterRecord, StoreError> {
        self.write(|state| state.insert(printer)).await
    }

    async fn put_many(&self, printers: Vec<NewPrinter>) -> Result<Vec<PrinterRecord>, StoreError> {
        self.write(|state| state.insert_many(printers)).await
    }

    async fn update(&self, record: PrinterRecord) -> Result<PrinterRecord, StoreError> {
        self.write(|state| state.update(record)).await
    }

    async fn delete_one(&self, id: u64) -> Result<PrinterRecord, StoreError> {
        self.write(|state| state.remove(id)).await
    }

    async fn delete_all(&self) -> Result<usize, StoreError> {
        self.write(|state| Ok(state.clear())).await
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(TEMP_SUFFIX);
    PathBuf::from(name)
}

async fn persist(path: &Path, state: &RegistryState) -> Result<(), StoreError> {
    let bytes = serde_json::to_vec_pretty(&state.to_file())
        .map_err(|err| StoreError::io(format!("encode registry: {err}")))?;
    let tmp = temp_path(path);
    let mut file = tokio::fs::File::create(&tmp).await?;
    file.write_all(&bytes).await?;
    file.sync_all().await?;
    drop(file);
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}
