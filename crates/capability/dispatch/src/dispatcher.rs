//! 指令分发器
//!
//! ```text
//! device:   validate → lookup → ready? → encode → send → decode
//! registry: validate → parse body → PrinterStore
//! ```
//!
//! 本层不重试：第一个失败阶段的错误直接返回给调用方。

use crate::error::{DispatchError, Stage};
use crate::request::{Category, LogicalRequest, RegistryCommand};
use domain::{DeviceKey, DomainError, NewPrinter, PrinterRecord};
use printcomm_protocol::{CommandKind, DeviceReply, DeviceTransport, decode_kind, encode_kind};
use printcomm_storage::{PrinterStore, StoreError};
use printcomm_telemetry::{
    record_device_command_failed, record_device_command_sent, record_registry_failure,
    record_registry_request, record_request_timed_out,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

/// 分发器配置。
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// 单次设备会话（连接 + 写 + 读）的期限
    pub printer_timeout: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            printer_timeout: Duration::from_secs(1),
        }
    }
}

/// 分发结果。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DispatchOutcome {
    Device {
        command: CommandKind,
        printer_id: u64,
        reply: DeviceReply,
    },
    Printer {
        printer: PrinterRecord,
    },
    Printers {
        printers: Vec<PrinterRecord>,
    },
    Deleted {
        printer: PrinterRecord,
    },
    Cleared {
        count: usize,
    },
}

/// `GetPrinter` / `DelPrinter` 的指令体。
#[derive(Debug, Default, Deserialize)]
struct KeyBody {
    #[serde(default)]
    uid: Option<String>,
    #[serde(default)]
    id: Option<u64>,
}

#[derive(Clone)]
pub struct Dispatcher {
    store: Arc<dyn PrinterStore>,
    transport: Arc<dyn DeviceTransport>,
    config: DispatcherConfig,
}

impl Dispatcher {
    pub fn new(store: Arc<dyn PrinterStore>, transport: Arc<dyn DeviceTransport>) -> Self {
        Self::new_with_config(store, transport, DispatcherConfig::default())
    }

    pub fn new_with_config(
        store: Arc<dyn PrinterStore>,
        transport: Arc<dyn DeviceTransport>,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            store,
            transport,
            config,
        }
    }

    pub fn store(&self) -> &Arc<dyn PrinterStore> {
        &self.store
    }

    /// 开始前已过期则直接拒绝；一旦开始就执行到底，不在中途取消存储写入。
    ///
    /// 设备会话自身受 `printer_timeout` 约束。
    pub async fn dispatch_with_deadline(
        &self,
        request: LogicalRequest,
        deadline: Instant,
    ) -> Result<DispatchOutcome, DispatchError> {
        if Instant::now() >= deadline {
            record_request_timed_out();
            return Err(DispatchError::DeadlineExceeded);
        }
        self.dispatch(request).await
    }

    pub async fn dispatch(&self, request: LogicalRequest) -> Result<DispatchOutcome, DispatchError> {
        let category: Category = request.category.parse()?;
        if request.command.trim().is_empty() {
            return Err(DispatchError::EmptyCommand);
        }
        match category {
            Category::Device => self.dispatch_device(request).await,
            Category::Registry => {
                let command: RegistryCommand = request.command.parse()?;
                record_registry_request();
                let result = self.dispatch_registry(command, &request).await;
                match &result {
                    Ok(_) => info!(
                        target: "printcomm.dispatch",
                        command = %command,
                        write = command.is_write(),
                        "registry_request_done"
                    ),
                    Err(err) => {
                        record_registry_failure();
                        warn!(
                            target: "printcomm.dispatch",
                            command = %command,
                            error = %err,
                            "registry_request_failed"
                        );
                    }
                }
                result
            }
        }
    }

    async fn dispatch_device(
        &self,
        request: LogicalRequest,
    ) -> Result<DispatchOutcome, DispatchError> {
        let kind: CommandKind = request.command.parse().map_err(|source| DispatchError::Protocol {
            stage: Stage::Encode,
            source,
        })?;
        let target = request
            .target
            .clone()
            .ok_or(DomainError::AmbiguousIdentifier)?;

        let printer = self.store.get_one(&target).await.map_err(|err| match err {
            StoreError::NotFound(_) => {
                DispatchError::DeviceNotFound(target.to_string())
            }
            source => DispatchError::Store {
                stage: Stage::Lookup,
                source,
            },
        })?;
        if !printer.status.is_dispatchable() {
            warn!(
                target: "printcomm.dispatch",
                printer_id = printer.id,
                status = %printer.status,
                command = %kind,
                "device_not_ready"
            );
            return Err(DispatchError::DeviceNotReady {
                target: target.to_string(),
                status: printer.status,
                line: request.line.clone().or_else(|| printer.line.clone()),
            });
        }

        let frame = encode_kind(kind, &request.body).map_err(|source| DispatchError::Protocol {
            stage: Stage::Encode,
            source,
        })?;
        let addr = printer.address();
        let started_at = std::time::Instant::now();
        let reply = match self
            .transport
            .send(&addr, &frame, self.config.printer_timeout)
            .await
        {
            Ok(reply) => reply,
            Err(err) => {
                record_device_command_failed();
                warn!(
                    target: "printcomm.dispatch",
                    printer_id = printer.id,
                    device_addr = %addr,
                    command = %kind,
                    error = %err,
                    "device_send_failed"
                );
                return Err(DispatchError::Transport(err));
            }
        };
        let reply = decode_kind(kind, &reply).map_err(|source| {
            record_device_command_failed();
            DispatchError::Protocol {
                stage: Stage::Decode,
                source,
            }
        })?;
        let latency_ms = started_at.elapsed().as_millis() as u64;
        record_device_command_sent(latency_ms);
        info!(
            target: "printcomm.dispatch",
            printer_id = printer.id,
            device_addr = %addr,
            command = %kind,
            latency_ms = latency_ms,
            "device_command_done"
        );

        Ok(DispatchOutcome::Device {
            command: kind,
            printer_id: printer.id,
            reply,
        })
    }

    async fn dispatch_registry(
        &self,
        command: RegistryCommand,
        request: &LogicalRequest,
    ) -> Result<DispatchOutcome, DispatchError> {
        let store_err = |source: StoreError| DispatchError::Store {
            stage: Stage::Registry,
            source,
        };
        match command {
            RegistryCommand::GetOne => {
                let key = key_from_body(command, request)?;
                let printer = self.store.get_one(&key).await.map_err(store_err)?;
                Ok(DispatchOutcome::Printer { printer })
            }
            RegistryCommand::GetAll => {
                let printers = self.store.get_all().await.map_err(store_err)?;
                Ok(DispatchOutcome::Printers { printers })
            }
            RegistryCommand::PutOne => {
                let printer: NewPrinter = parse_body(command, &request.body)?;
                let printer = self.store.put_one(printer).await.map_err(store_err)?;
                Ok(DispatchOutcome::Printer { printer })
            }
            RegistryCommand::PutMany => {
                let printers: Vec<NewPrinter> = parse_body(command, &request.body)?;
                let printers = self.store.put_many(printers).await.map_err(store_err)?;
                Ok(DispatchOutcome::Printers { printers })
            }
            RegistryCommand::Update => {
                let record: PrinterRecord = parse_body(command, &request.body)?;
                let printer = self.store.update(record).await.map_err(store_err)?;
                Ok(DispatchOutcome::Printer { printer })
            }
            RegistryCommand::DeleteOne => {
                let id = match key_from_body(command, request)? {
                    DeviceKey::ById(id) => id,
                    key @ DeviceKey::ByUid(_) => {
                        self.store.get_one(&key).await.map_err(store_err)?.id
                    }
                };
                let printer = self.store.delete_one(id).await.map_err(store_err)?;
                Ok(DispatchOutcome::Deleted { printer })
            }
            RegistryCommand::DeleteAll => {
                let count = self.store.delete_all().await.map_err(store_err)?;
                Ok(DispatchOutcome::Cleared { count })
            }
        }
    }
}

/// 从指令体读取 uid / id；指令体为空时退回到请求自带的目标。
fn key_from_body(
    command: RegistryCommand,
    request: &LogicalRequest,
) -> Result<DeviceKey, DispatchError> {
    if request.body.trim().is_empty() {
        return request
            .target
            .clone()
            .ok_or(DispatchError::Invalid(DomainError::AmbiguousIdentifier));
    }
    let body: KeyBody = parse_body(command, &request.body)?;
    Ok(DeviceKey::from_parts(body.uid.as_deref(), body.id)?)
}

fn parse_body<T: serde::de::DeserializeOwned>(
    command: RegistryCommand,
    body: &str,
) -> Result<T, DispatchError> {
    serde_json::from_str(body).map_err(|err| DispatchError::InvalidBody {
        command: command.name().to_string(),
        reason: err.to_string(),
    })
}
