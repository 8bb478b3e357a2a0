//! # 指令分发模块
//!
//! 接收边界层的逻辑请求，按类别路由到设备协议链路或注册表存储：
//! - `device`（`sendcmdtoprinter`）：查表 → 状态检查 → 编码 → 发送 → 解码
//! - `registry`（`requesttodb`）：单次 [`PrinterStore`](printcomm_storage::PrinterStore) 调用
//!
//! 存储与传输都以 `Arc<dyn Trait>` 注入，测试中可替换为假实现。

mod dispatcher;
mod error;
mod request;

pub use dispatcher::{DispatchOutcome, Dispatcher, DispatcherConfig};
pub use error::{DispatchError, Stage};
pub use request::{Category, LogicalRequest, RegistryCommand};
