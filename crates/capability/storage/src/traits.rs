//! 存储接口 Trait 定义
//!
//! 设计原则：
//! - 查不到记录返回 `StoreError::NotFound`，而不是 `Ok(None)`
//! - 所有接口返回 StoreError
//! - 使用 async_trait 支持动态分发（`Arc<dyn PrinterStore>`）

use crate::error::StoreError;
use async_trait::async_trait;
use domain::{DeviceKey, NewPrinter, PrinterRecord};

/// 打印机注册表存储接口
///
/// 实现需保证并发读安全，写操作在内部串行化。
#[async_trait]
pub trait PrinterStore: Send + Sync {
    /// 按 uid 或 id 查找单台打印机
    async fn get_one(&self, key: &DeviceKey) -> Result<PrinterRecord, StoreError>;

    /// 列出全部打印机（按 id 升序）
    async fn get_all(&self) -> Result<Vec<PrinterRecord>, StoreError>;

    /// 新增一台打印机，分配新的 id
    async fn put_one(&self, printer: NewPrinter) -> Result<PrinterRecord, StoreError>;

    /// 批量新增；任意一条失败则整批不写入
    async fn put_many(&self, printers: Vec<NewPrinter>) -> Result<Vec<PrinterRecord>, StoreError>;

    /// 整体替换字段（id / uid 不可变）
    async fn update(&self, record: PrinterRecord) -> Result<PrinterRecord, StoreError>;

    /// 删除单台打印机，返回被删除的记录
    async fn delete_one(&self, id: u64) -> Result<PrinterRecord, StoreError>;

    /// 清空注册表，返回删除条数
    async fn delete_all(&self) -> Result<usize, StoreError>;
}
