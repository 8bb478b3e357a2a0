//! 打印机指令编解码
//!
//! 线路格式为单行 ASCII：`NAME[ SP BODY] LF`，整帧不超过 [`MAX_FRAME_LEN`] 字节。
//! 应答同样是单行，以 `LF` 结尾（允许前置 `CR`）。
//!
//! ```text
//! -> PRINT_LABEL A=1;B=2\n        <- OK\n
//! -> GET_STATUS\n                 <- STATUS 0 READY\n
//! -> GET_COUNTER\n                <- COUNTER 1520\n
//! -> ECHO hello\n                 <- ECHO hello OK\n
//! -> LOAD_TEMPLATE label_a\n      <- ERR 12 template not found\n
//! ```
//!
//! 编解码都是纯函数，不持有任何状态，可在多个设备会话间并发使用。

use crate::error::CodecError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// 单帧（含终止符）最大字节数
pub const MAX_FRAME_LEN: usize = 256;

/// ECHO 指令体最大字节数
pub const MAX_ECHO_LEN: usize = 200;

const MAX_LABEL_FIELDS: usize = 16;
const MAX_LABEL_KEY_LEN: usize = 16;
const MAX_TEMPLATE_LEN: usize = 32;
const ECHO_SUFFIX: &str = " OK";

/// 支持的指令集合
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandKind {
    /// 按字段打印标签
    PrintLabel,
    /// 切换打印模板
    LoadTemplate,
    /// 清空打印缓冲区
    ClearBuffer,
    /// 查询设备状态
    GetStatus,
    /// 读取打印计数器
    GetCounter,
    /// 设置打印计数器
    SetCounter,
    /// 回显（链路自检）
    Echo,
}

impl CommandKind {
    pub const ALL: [CommandKind; 7] = [
        CommandKind::PrintLabel,
        CommandKind::LoadTemplate,
        CommandKind::ClearBuffer,
        CommandKind::GetStatus,
        CommandKind::GetCounter,
        CommandKind::SetCounter,
        CommandKind::Echo,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::PrintLabel => "PRINT_LABEL",
            Self::LoadTemplate => "LOAD_TEMPLATE",
            Self::ClearBuffer => "CLEAR_BUFFER",
            Self::GetStatus => "GET_STATUS",
            Self::GetCounter => "GET_COUNTER",
            Self::SetCounter => "SET_COUNTER",
            Self::Echo => "ECHO",
        }
    }
}

impl FromStr for CommandKind {
    type Err = CodecError;

    /// 指令名大小写不敏感。
    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| CodecError::UnknownCommand(name.to_string()))
    }
}

impl std::fmt::Display for CommandKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// 设备状态（GET_STATUS 应答中的状态码）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrinterState {
    Ready,
    Busy,
    Paused,
    OutOfMedia,
    Fault,
    Unknown,
}

impl PrinterState {
    pub fn from_code(code: u16) -> Self {
        match code {
            0 => Self::Ready,
            1 => Self::Busy,
            2 => Self::Paused,
            3 => Self::OutOfMedia,
            4 => Self::Fault,
            _ => Self::Unknown,
        }
    }
}

/// 解码后的设备应答
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeviceReply {
    /// 设备确认执行
    Ack,
    Status {
        code: u16,
        state: PrinterState,
        #[serde(skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    },
    Counter {
        value: u64,
    },
    Echo {
        body: String,
    },
}

/// 按指令名编码
pub fn encode(command: &str, body: &str) -> Result<Vec<u8>, CodecError> {
    encode_kind(command.parse()?, body)
}

/// 按指令名解码
pub fn decode(command: &str, reply: &[u8]) -> Result<DeviceReply, CodecError> {
    decode_kind(command.parse()?, reply)
}

/// 编码为线路帧（含 `\n` 终止符）。
pub fn encode_kind(kind: CommandKind, body: &str) -> Result<Vec<u8>, CodecError> {
    if let Some(bad) = body.chars().find(|c| c.is_control()) {
        return Err(malformed(kind, format!("control character {:?} in body", bad)));
    }
    match kind {
        CommandKind::PrintLabel => validate_label_fields(body)?,
        CommandKind::LoadTemplate => validate_template_name(body)?,
        CommandKind::ClearBuffer | CommandKind::GetStatus | CommandKind::GetCounter => {
            if !body.is_empty() {
                return Err(malformed(kind, "command takes no body"));
            }
        }
        CommandKind::SetCounter => {
            body.parse::<u64>()
                .map_err(|_| malformed(kind, format!("'{}' is not an unsigned integer", body)))?;
        }
        CommandKind::Echo => {
            if body.len() > MAX_ECHO_LEN {
                return Err(malformed(kind, format!("body exceeds {} bytes", MAX_ECHO_LEN)));
            }
        }
    }

    let mut frame = String::with_capacity(kind.name().len() + body.len() + 2);
    frame.push_str(kind.name());
    if !body.is_empty() {
        frame.push(' ');
        frame.push_str(body);
    }
    frame.push('\n');
    if frame.len() > MAX_FRAME_LEN {
        return Err(malformed(kind, format!("frame exceeds {} bytes", MAX_FRAME_LEN)));
    }
    Ok(frame.into_bytes())
}

/// 解码设备应答。
pub fn decode_kind(kind: CommandKind, reply: &[u8]) -> Result<DeviceReply, CodecError> {
    let line = reply_line(kind, reply)?;

    if line == "ERR" || line.starts_with("ERR ") {
        return Err(parse_device_error(kind, line));
    }

    match kind {
        CommandKind::PrintLabel
        | CommandKind::LoadTemplate
        | CommandKind::ClearBuffer
        | CommandKind::SetCounter => {
            if line == "OK" {
                Ok(DeviceReply::Ack)
            } else {
                Err(violation(kind, format!("expected 'OK', got '{}'", line)))
            }
        }
        CommandKind::GetStatus => {
            let rest = line
                .strip_prefix("STATUS ")
                .ok_or_else(|| violation(kind, format!("expected 'STATUS <code>', got '{}'", line)))?;
            let (code, text) = match rest.split_once(' ') {
                Some((code, text)) => (code, Some(text.trim().to_string())),
                None => (rest, None),
            };
            let code = code
                .parse::<u16>()
                .map_err(|_| violation(kind, format!("bad status code '{}'", code)))?;
            Ok(DeviceReply::Status {
                code,
                state: PrinterState::from_code(code),
                text: text.filter(|text| !text.is_empty()),
            })
        }
        CommandKind::GetCounter => {
            let value = line
                .strip_prefix("COUNTER ")
                .and_then(|value| value.parse::<u64>().ok())
                .ok_or_else(|| violation(kind, format!("expected 'COUNTER <n>', got '{}'", line)))?;
            Ok(DeviceReply::Counter { value })
        }
        CommandKind::Echo => {
            // 应答为请求本身加固定后缀：`ECHO <body> OK`
            if line == "ECHO OK" {
                return Ok(DeviceReply::Echo {
                    body: String::new(),
                });
            }
            let body = line
                .strip_prefix("ECHO ")
                .and_then(|rest| rest.strip_suffix(ECHO_SUFFIX))
                .ok_or_else(|| violation(kind, format!("expected echo of request, got '{}'", line)))?;
            Ok(DeviceReply::Echo {
                body: body.to_string(),
            })
        }
    }
}

/// 校验帧边界并取出去掉终止符的应答行。
fn reply_line(kind: CommandKind, reply: &[u8]) -> Result<&str, CodecError> {
    if reply.is_empty() {
        return Err(violation(kind, "empty reply"));
    }
    if reply.len() > MAX_FRAME_LEN {
        return Err(violation(
            kind,
            format!("reply of {} bytes exceeds {}", reply.len(), MAX_FRAME_LEN),
        ));
    }
    let body = reply
        .strip_suffix(b"\n")
        .ok_or_else(|| violation(kind, "missing LF terminator"))?;
    let body = body.strip_suffix(b"\r").unwrap_or(body);
    if body.contains(&b'\n') || body.contains(&b'\r') {
        return Err(violation(kind, "more than one line in reply"));
    }
    std::str::from_utf8(body).map_err(|_| violation(kind, "reply is not valid utf-8"))
}

fn parse_device_error(kind: CommandKind, line: &str) -> CodecError {
    let rest = line.strip_prefix("ERR").unwrap_or_default().trim();
    let (code, message) = match rest.split_once(' ') {
        Some((code, message)) => (code, message.trim()),
        None => (rest, ""),
    };
    match code.parse::<u16>() {
        Ok(code) => CodecError::ProtocolViolation {
            command: kind.name().to_string(),
            reason: if message.is_empty() {
                format!("device error {code}")
            } else {
                format!("device error {code}: {message}")
            },
            status: Some(code),
        },
        Err(_) => violation(kind, format!("unparsable error reply '{}'", line)),
    }
}

fn validate_label_fields(body: &str) -> Result<(), CodecError> {
    let kind = CommandKind::PrintLabel;
    if body.is_empty() {
        return Err(malformed(kind, "at least one KEY=VALUE field required"));
    }
    let fields: Vec<&str> = body.split(';').collect();
    if fields.len() > MAX_LABEL_FIELDS {
        return Err(malformed(
            kind,
            format!("{} fields exceed the limit of {}", fields.len(), MAX_LABEL_FIELDS),
        ));
    }
    for field in fields {
        let (key, _value) = field
            .split_once('=')
            .ok_or_else(|| malformed(kind, format!("field '{}' is not KEY=VALUE", field)))?;
        let key_ok = !key.is_empty()
            && key.len() <= MAX_LABEL_KEY_LEN
            && key
                .bytes()
                .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'_');
        if !key_ok {
            return Err(malformed(kind, format!("invalid field key '{}'", key)));
        }
    }
    Ok(())
}

fn validate_template_name(body: &str) -> Result<(), CodecError> {
    let kind = CommandKind::LoadTemplate;
    let valid = !body.is_empty()
        && body.len() <= MAX_TEMPLATE_LEN
        && body
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b'-'));
    if !valid {
        return Err(malformed(kind, format!("invalid template name '{}'", body)));
    }
    Ok(())
}

fn malformed(kind: CommandKind, reason: impl Into<String>) -> CodecError {
    CodecError::MalformedBody {
        command: kind.name().to_string(),
        reason: reason.into(),
    }
}

fn violation(kind: CommandKind, reason: impl Into<String>) -> CodecError {
    CodecError::ProtocolViolation {
        command: kind.name().to_string(),
        reason: reason.into(),
        status: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn command_names_are_unique() {
        let names: HashSet<&str> = CommandKind::ALL.iter().map(|kind| kind.name()).collect();
        assert_eq!(names.len(), CommandKind::ALL.len());
        for kind in CommandKind::ALL {
            assert_eq!(kind.name().parse::<CommandKind>(), Ok(kind));
        }
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(" print_label ".parse::<CommandKind>(), Ok(CommandKind::PrintLabel));
        assert_eq!(
            "FEED".parse::<CommandKind>(),
            Err(CodecError::UnknownCommand("FEED".to_string()))
        );
    }

    #[test]
    fn test_encode_frames() {
        assert_eq!(encode("PRINT_LABEL", "A=1").unwrap(), b"PRINT_LABEL A=1\n");
        assert_eq!(encode("get_status", "").unwrap(), b"GET_STATUS\n");
        assert_eq!(encode("SET_COUNTER", "15").unwrap(), b"SET_COUNTER 15\n");
    }

    #[test]
    fn test_encode_rejects_bad_bodies() {
        let cases = [
            ("PRINT_LABEL", ""),
            ("PRINT_LABEL", "A"),
            ("PRINT_LABEL", "a=1"),
            ("LOAD_TEMPLATE", "bad name"),
            ("GET_STATUS", "now"),
            ("SET_COUNTER", "-1"),
            ("ECHO", "line\nbreak"),
        ];
        for (command, body) in cases {
            assert!(
                matches!(encode(command, body), Err(CodecError::MalformedBody { .. })),
                "{command} {body:?}"
            );
        }
        let long = "x".repeat(MAX_ECHO_LEN + 1);
        assert!(matches!(
            encode("ECHO", &long),
            Err(CodecError::MalformedBody { .. })
        ));
    }

    #[test]
    fn test_decode_framing() {
        assert_eq!(decode("PRINT_LABEL", b"OK\n"), Ok(DeviceReply::Ack));
        assert_eq!(decode("PRINT_LABEL", b"OK\r\n"), Ok(DeviceReply::Ack));
        let replies: [&[u8]; 4] = [b"", b"OK", b"OK\nOK\n", b"NOPE\n"];
        for reply in replies {
            assert!(
                matches!(
                    decode("PRINT_LABEL", reply),
                    Err(CodecError::ProtocolViolation { .. })
                ),
                "{reply:?}"
            );
        }
    }

    #[test]
    fn test_decode_status_and_counter() {
        assert_eq!(
            decode("GET_STATUS", b"STATUS 3 ribbon out\n"),
            Ok(DeviceReply::Status {
                code: 3,
                state: PrinterState::OutOfMedia,
                text: Some("ribbon out".to_string()),
            })
        );
        assert_eq!(
            decode("GET_COUNTER", b"COUNTER 1520\n"),
            Ok(DeviceReply::Counter { value: 1520 })
        );
        assert!(decode("GET_COUNTER", b"COUNTER x\n").is_err());
    }

    #[test]
    fn test_decode_device_error() {
        assert_eq!(
            decode("LOAD_TEMPLATE", b"ERR 12 template not found\n"),
            Err(CodecError::ProtocolViolation {
                command: "LOAD_TEMPLATE".to_string(),
                reason: "device error 12: template not found".to_string(),
                status: Some(12),
            })
        );
        assert!(matches!(
            decode("CLEAR_BUFFER", b"ERR 7\n"),
            Err(CodecError::ProtocolViolation { status: Some(7), .. })
        ));
    }

    #[test]
    fn test_echo_recovers_body() {
        let frame = encode("ECHO", "label 42; ok").unwrap();
        // 设备回显请求并附加状态后缀
        let mut reply = frame[..frame.len() - 1].to_vec();
        reply.extend_from_slice(b" OK\n");
        assert_eq!(
            decode("ECHO", &reply),
            Ok(DeviceReply::Echo {
                body: "label 42; ok".to_string()
            })
        );
        assert_eq!(
            decode("ECHO", b"ECHO OK\n"),
            Ok(DeviceReply::Echo {
                body: String::new()
            })
        );
    }
}
