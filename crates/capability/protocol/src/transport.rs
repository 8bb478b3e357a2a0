//! 设备 TCP 传输
//!
//! 每次调用建立一条短连接：解析地址 → 连接 → 写指令帧 → 读到 `\n` 为止 → 关闭。
//! 解析、连接、写入、读取共用同一个期限；任何退出路径上连接都会随 `TcpStream` 一起释放。
//!
//! ## 使用示例
//!
//! ```rust,ignore
//! let transport = TcpTransport::new();
//! let reply = transport
//!     .send("10.0.0.5:9100", b"GET_STATUS\n", Duration::from_secs(1))
//!     .await?;
//! ```

use crate::codec::MAX_FRAME_LEN;
use crate::error::TransportError;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, lookup_host};
use tracing::debug;

/// 设备传输抽象（便于在分发层替换为测试桩）
#[async_trait]
pub trait DeviceTransport: Send + Sync {
    /// 发送一帧并读取一行应答（含终止符）。
    async fn send(
        &self,
        addr: &str,
        frame: &[u8],
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError>;
}

/// 基于 tokio 的短连接 TCP 传输
#[derive(Debug, Clone)]
pub struct TcpTransport {
    max_reply_len: usize,
}

impl TcpTransport {
    pub fn new() -> Self {
        Self {
            max_reply_len: MAX_FRAME_LEN,
        }
    }

    /// 调整应答的最大长度（超出即视为截断）。
    pub fn with_max_reply_len(mut self, max_reply_len: usize) -> Self {
        self.max_reply_len = max_reply_len.max(1);
        self
    }

    async fn exchange(&self, addr: &str, frame: &[u8]) -> Result<Vec<u8>, TransportError> {
        let resolved = resolve(addr).await?;
        let mut stream = TcpStream::connect(resolved.as_slice())
            .await
            .map_err(|err| connect_error(addr, err))?;
        stream.set_nodelay(true).map_err(|err| io_error(addr, err))?;

        stream
            .write_all(frame)
            .await
            .map_err(|err| io_error(addr, err))?;
        stream.flush().await.map_err(|err| io_error(addr, err))?;
        debug!(target: "printcomm.protocol", device_addr = %addr, frame_len = frame.len(), "frame_sent");

        let mut reply = Vec::with_capacity(64);
        let mut buf = [0u8; 128];
        loop {
            let read = stream
                .read(&mut buf)
                .await
                .map_err(|err| io_error(addr, err))?;
            if read == 0 {
                return Err(if reply.is_empty() {
                    TransportError::ShortRead {
                        addr: addr.to_string(),
                    }
                } else {
                    TransportError::Truncated {
                        addr: addr.to_string(),
                        received: reply.len(),
                    }
                });
            }
            reply.extend_from_slice(&buf[..read]);
            if let Some(end) = reply.iter().position(|byte| *byte == b'\n') {
                // 终止符之后的字节不属于本次应答
                reply.truncate(end + 1);
                break;
            }
            if reply.len() >= self.max_reply_len {
                return Err(TransportError::Truncated {
                    addr: addr.to_string(),
                    received: reply.len(),
                });
            }
        }
        debug!(target: "printcomm.protocol", device_addr = %addr, reply_len = reply.len(), "reply_received");
        Ok(reply)
    }
}

impl Default for TcpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeviceTransport for TcpTransport {
    async fn send(
        &self,
        addr: &str,
        frame: &[u8],
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        match tokio::time::timeout(timeout, self.exchange(addr, frame)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout {
                addr: addr.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            }),
        }
    }
}

/// 解析 `host:port`；格式错误、DNS 失败或无结果都视为地址无效。
async fn resolve(addr: &str) -> Result<Vec<SocketAddr>, TransportError> {
    let invalid = |reason: String| TransportError::InvalidAddress {
        addr: addr.to_string(),
        reason,
    };
    let resolved: Vec<SocketAddr> = lookup_host(addr)
        .await
        .map_err(|err| invalid(err.to_string()))?
        .collect();
    if resolved.is_empty() {
        return Err(invalid("address resolved to nothing".to_string()));
    }
    Ok(resolved)
}

fn connect_error(addr: &str, err: std::io::Error) -> TransportError {
    match err.kind() {
        ErrorKind::ConnectionRefused => TransportError::ConnectionRefused {
            addr: addr.to_string(),
        },
        _ => io_error(addr, err),
    }
}

fn io_error(addr: &str, err: std::io::Error) -> TransportError {
    TransportError::Io {
        addr: addr.to_string(),
        source: err,
    }
}
