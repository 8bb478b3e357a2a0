//! # 打印机注册表存储模块
//!
//! ## 架构设计
//!
//! 1. **接口抽象层** (`traits.rs`)：[`PrinterStore`] 异步 Trait
//! 2. **错误处理层** (`error.rs`)：统一的 [`StoreError`]
//! 3. **状态层** (`state.rs`)：两种实现共用的身份规则（id 不复用、uid 退役）
//! 4. **实现层**：
//!    - [`InMemoryPrinterStore`]：内存实现（测试、演示）
//!    - [`FilePrinterStore`]：目录 + JSON 文件实现（生产环境使用，可被备份模块直接复制）
//!
//! ## 使用示例
//!
//! ```rust,ignore
//! use printcomm_storage::{FilePrinterStore, PrinterStore};
//! use std::sync::Arc;
//!
//! let store: Arc<dyn PrinterStore> = Arc::new(FilePrinterStore::open("./data/registry").await?);
//! let printers = store.get_all().await?;
//! ```

pub mod error;
pub mod file;
pub mod in_memory;
mod state;
pub mod traits;

pub use error::StoreError;
pub use file::{FilePrinterStore, REGISTRY_FILE, TEMP_SUFFIX};
pub use in_memory::InMemoryPrinterStore;
pub use traits::PrinterStore;
