//! # 打印机协议能力模块
//!
//! 提供与网络打印机对话所需的两层能力：
//! - **指令编解码**（[`codec`]）：逻辑指令名 + 指令体 → 线路帧；应答帧 → 结构化结果
//! - **设备传输**（[`transport`]）：带期限的短连接 TCP 会话
//!
//! ## 架构设计
//!
//! ```text
//! Dispatcher
//!       │
//!       ├── codec::encode_kind   (纯函数)
//!       ├── DeviceTransport::send (connect + write + read，单一期限)
//!       └── codec::decode_kind   (纯函数)
//! ```

pub mod codec;
mod error;
pub mod transport;

pub use codec::{
    CommandKind, DeviceReply, MAX_ECHO_LEN, MAX_FRAME_LEN, PrinterState, decode, decode_kind,
    encode, encode_kind,
};
pub use error::{CodecError, TransportError};
pub use transport::{DeviceTransport, TcpTransport};
