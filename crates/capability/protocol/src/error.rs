//! 协议错误类型定义

/// 指令编解码错误
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// 不支持的指令名
    #[error("unknown command: '{0}'")]
    UnknownCommand(String),

    /// 指令体不符合该指令的语法
    #[error("malformed body for {command}: {reason}")]
    MalformedBody { command: String, reason: String },

    /// 应答帧格式错误，或设备以 `ERR <code>` 拒绝（`status` 为设备状态码）
    #[error("protocol violation in {command} reply: {reason}")]
    ProtocolViolation {
        command: String,
        reason: String,
        status: Option<u16>,
    },
}

/// 设备传输错误
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// 连接 + 写入 + 读取 超出期限
    #[error("device {addr} timed out after {timeout_ms}ms")]
    Timeout { addr: String, timeout_ms: u64 },

    /// 设备不可达
    #[error("connection refused by {addr}")]
    ConnectionRefused { addr: String },

    /// 地址无法解析
    #[error("invalid device address '{addr}': {reason}")]
    InvalidAddress { addr: String, reason: String },

    /// 未收到任何应答字节即断开
    #[error("device {addr} closed the connection without replying")]
    ShortRead { addr: String },

    /// 应答不完整（中途断开或超长无终止符）
    #[error("reply from {addr} truncated after {received} bytes")]
    Truncated { addr: String, received: usize },

    /// 其它 IO 错误
    #[error("io error talking to {addr}: {source}")]
    Io {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}
