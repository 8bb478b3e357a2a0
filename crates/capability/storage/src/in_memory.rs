//! 打印机注册表内存实现
//!
//! 仅用于测试和不需要持久化的本地演示。

use crate::error::StoreError;
use crate::state::RegistryState;
use crate::traits::PrinterStore;
use domain::{DeviceKey, NewPrinter, PrinterRecord};
use std::sync::RwLock;

/// 打印机注册表内存存储
pub struct InMemoryPrinterStore {
    state: RwLock<RegistryState>,
}

impl InMemoryPrinterStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(RegistryState::default()),
        }
    }

    fn read<T>(&self, f: impl FnOnce(&RegistryState) -> T) -> Result<T, StoreError> {
        let state = self
            .state
            .read()
            .map_err(|_| StoreError::io("lock poisoned"))?;
        Ok(f(&state))
    }

    fn write<T>(
        &self,
        f: impl FnOnce(&mut RegistryState) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| StoreError::io("lock poisoned"))?;
        // 在副本上执行，失败时原状态保持不变
        let mut draft = state.clone();
        let result = f(&mut draft)?;
        *state = draft;
        Ok(result)
    }
}

impl Default for InMemoryPrinterStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl PrinterStore for InMemoryPrinterStore {
    async fn get_one(&self, key: &DeviceKey) -> Result<PrinterRecord, StoreError> {
        self.read(|state| state.get(key))?
    }

    async fn get_all(&self) -> Result<Vec<PrinterRecord>, StoreError> {
        self.read(RegistryState::all)
    }

    async fn put_one(&self, printer: NewPrinter) -> Result<PrinterRecord, StoreError> {
        self.write(|state| state.insert(printer))
    }

    async fn put_many(&self, printers: Vec<NewPrinter>) -> Result<Vec<PrinterRecord>, StoreError> {
        self.write(|state| state.insert_many(printers))
    }

    async fn update(&self, record: PrinterRecord) -> Result<PrinterRecord, StoreError> {
        self.write(|state| state.update(record))
    }

    async fn delete_one(&self, id: u64) -> Result<PrinterRecord, StoreError> {
        self.write(|state| state.remove(id))
    }

    async fn delete_all(&self) -> Result<usize, StoreError> {
        self.write(|state| Ok(state.clear()))
    }
}
