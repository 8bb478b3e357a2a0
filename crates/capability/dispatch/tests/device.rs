use async_trait::async_trait;
use domain::{DeviceKey, ErrorKind, NewPrinter, PrinterRecord, PrinterStatus};
use printcomm_dispatch::{DispatchError, DispatchOutcome, Dispatcher, LogicalRequest, Stage};
use printcomm_protocol::{CodecError, CommandKind, DeviceReply, DeviceTransport, TransportError};
use printcomm_storage::{InMemoryPrinterStore, PrinterStore};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// 记录每次调用并按脚本应答的传输桩。
struct ScriptedTransport {
    reply: Result<Vec<u8>, &'static str>,
    calls: Mutex<Vec<(String, Vec<u8>)>>,
}

impl ScriptedTransport {
    fn replying(reply: &[u8]) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(reply.to_vec()),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn timing_out() -> Arc<Self> {
        Arc::new(Self {
            reply: Err("timeout"),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<(String, Vec<u8>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl DeviceTransport for ScriptedTransport {
    async fn send(
        &self,
        addr: &str,
        frame: &[u8],
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        self.calls
            .lock()
            .unwrap()
            .push((addr.to_string(), frame.to_vec()));
        match &self.reply {
            Ok(reply) => Ok(reply.clone()),
            Err(_) => Err(TransportError::Timeout {
                addr: addr.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            }),
        }
    }
}

async fn store_with(status: PrinterStatus, line: Option<&str>) -> (Arc<InMemoryPrinterStore>, PrinterRecord) {
    let store = Arc::new(InMemoryPrinterStore::new());
    let record = store
        .put_one(NewPrinter {
            uid: None,
            name: "labeler-1".to_string(),
            ip: "10.0.0.5".to_string(),
            port: 9100,
            status,
            line: line.map(str::to_string),
            description: None,
        })
        .await
        .expect("put");
    (store, record)
}

#[tokio::test]
async fn print_label_on_working_printer_succeeds() {
    let (store, record) = store_with(PrinterStatus::InTheWork, None).await;
    let transport = ScriptedTransport::replying(b"OK\n");
    let dispatcher = Dispatcher::new(store, transport.clone());

    let request = LogicalRequest {
        category: "sendcmdtoprinter".to_string(),
        command: "PRINT_LABEL".to_string(),
        body: "A=1".to_string(),
        target: Some(DeviceKey::ByUid(record.uid.clone())),
        line: None,
    };
    let outcome = dispatcher.dispatch(request).await.expect("dispatch");

    assert_eq!(
        outcome,
        DispatchOutcome::Device {
            command: CommandKind::PrintLabel,
            printer_id: record.id,
            reply: DeviceReply::Ack,
        }
    );
    assert_eq!(
        transport.calls(),
        vec![("10.0.0.5:9100".to_string(), b"PRINT_LABEL A=1\n".to_vec())]
    );
}

#[tokio::test]
async fn echo_reply_recovers_body() {
    let (store, record) = store_with(PrinterStatus::InTheWork, None).await;
    let transport = ScriptedTransport::replying(b"ECHO hello there OK\n");
    let dispatcher = Dispatcher::new(store, transport);

    let outcome = dispatcher
        .dispatch(LogicalRequest::device(DeviceKey::ById(record.id), "echo", "hello there"))
        .await
        .expect("dispatch");
    assert!(matches!(
        outcome,
        DispatchOutcome::Device { reply: DeviceReply::Echo { body }, .. } if body == "hello there"
    ));
}

#[tokio::test]
async fn idle_printer_is_not_contacted() {
    for status in [
        PrinterStatus::Idle,
        PrinterStatus::Disabled,
        PrinterStatus::UnderRepair,
        PrinterStatus::Decommissioned,
    ] {
        let (store, record) = store_with(status, Some("L2")).await;
        let transport = ScriptedTransport::replying(b"OK\n");
        let dispatcher = Dispatcher::new(store, transport.clone());

        let err = dispatcher
            .dispatch(LogicalRequest::device(DeviceKey::ById(record.id), "GET_STATUS", ""))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DeviceNotReady);
        assert!(err.to_string().ends_with("for line L2"), "{err}");
        assert!(transport.calls().is_empty());
    }
}

#[tokio::test]
async fn request_line_overrides_record_line_in_message() {
    let (store, record) = store_with(PrinterStatus::Idle, Some("L2")).await;
    let dispatcher = Dispatcher::new(store, ScriptedTransport::replying(b"OK\n"));

    let err = dispatcher
        .dispatch(LogicalRequest::device(DeviceKey::ById(record.id), "CLEAR_BUFFER", "").with_line("RM-04"))
        .await
        .unwrap_err();
    assert!(err.to_string().ends_with("for line RM-04"), "{err}");
}

#[tokio::test]
async fn unknown_printer_is_not_found() {
    let (store, _) = store_with(PrinterStatus::InTheWork, None).await;
    let transport = ScriptedTransport::replying(b"OK\n");
    let dispatcher = Dispatcher::new(store, transport.clone());

    let err = dispatcher
        .dispatch(LogicalRequest::device(DeviceKey::ById(99), "GET_STATUS", ""))
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::DeviceNotFound(_)));
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn malformed_body_fails_at_encode_stage() {
    let (store, record) = store_with(PrinterStatus::InTheWork, None).await;
    let transport = ScriptedTransport::replying(b"OK\n");
    let dispatcher = Dispatcher::new(store, transport.clone());

    let err = dispatcher
        .dispatch(LogicalRequest::device(DeviceKey::ById(record.id), "SET_COUNTER", "abc"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DispatchError::Protocol { stage: Stage::Encode, source: CodecError::MalformedBody { .. } }
    ));
    assert!(err.is_client_error());
    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn unknown_device_command_fails_before_lookup() {
    let store = Arc::new(InMemoryPrinterStore::new());
    let dispatcher = Dispatcher::new(store, ScriptedTransport::replying(b"OK\n"));

    let err = dispatcher
        .dispatch(LogicalRequest::device(DeviceKey::ById(1), "SELF_DESTRUCT", ""))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DispatchError::Protocol { source: CodecError::UnknownCommand(_), .. }
    ));
}

#[tokio::test]
async fn bad_reply_fails_at_decode_stage() {
    let (store, record) = store_with(PrinterStatus::InTheWork, None).await;
    let dispatcher = Dispatcher::new(store, ScriptedTransport::replying(b"COUNTER x\n"));

    let err = dispatcher
        .dispatch(LogicalRequest::device(DeviceKey::ById(record.id), "GET_COUNTER", ""))
        .await
        .unwrap_err();
    assert_eq!(err.stage(), Stage::Decode);
    assert_eq!(err.kind(), ErrorKind::Protocol);
    assert!(!err.is_client_error());
}

#[tokio::test]
async fn transport_failure_is_surfaced_without_retry() {
    let (store, record) = store_with(PrinterStatus::InTheWork, None).await;
    let transport = ScriptedTransport::timing_out();
    let dispatcher = Dispatcher::new(store, transport.clone());

    let err = dispatcher
        .dispatch(LogicalRequest::device(DeviceKey::ById(record.id), "GET_STATUS", ""))
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::Transport(TransportError::Timeout { .. })));
    assert_eq!(err.kind(), ErrorKind::Transport);
    assert_eq!(transport.calls().len(), 1);
}

#[tokio::test]
async fn missing_target_is_a_validation_error() {
    let store = Arc::new(InMemoryPrinterStore::new());
    let dispatcher = Dispatcher::new(store, ScriptedTransport::replying(b"OK\n"));

    let request = LogicalRequest {
        category: "device".to_string(),
        command: "GET_STATUS".to_string(),
        ..Default::default()
    };
    let err = dispatcher.dispatch(request).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}
