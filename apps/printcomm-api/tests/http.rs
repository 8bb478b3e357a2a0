use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
};
use domain::{NewPrinter, PrinterStatus};
use http_body_util::BodyExt;
use printcomm_api::{AppState, build_app};
use printcomm_backup::{BackupConfig, BackupManager};
use printcomm_dispatch::Dispatcher;
use printcomm_protocol::{DeviceTransport, TransportError};
use printcomm_storage::{InMemoryPrinterStore, PrinterStore};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

/// 固定应答的设备桩，可选延迟。
struct FixedTransport {
    reply: &'static [u8],
    delay: Duration,
}

#[async_trait]
impl DeviceTransport for FixedTransport {
    async fn send(
        &self,
        _addr: &str,
        _frame: &[u8],
        _timeout: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        tokio::time::sleep(self.delay).await;
        Ok(self.reply.to_vec())
    }
}

struct Harness {
    app: Router,
    store: Arc<InMemoryPrinterStore>,
    _dir: tempfile::TempDir,
}

fn harness_with(delay: Duration, request_timeout: Duration) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let registry_dir = dir.path().join("registry");
    std::fs::create_dir_all(&registry_dir).unwrap();
    std::fs::write(registry_dir.join("printers.json"), b"{}").unwrap();

    let store = Arc::new(InMemoryPrinterStore::new());
    let transport = Arc::new(FixedTransport {
        reply: b"STATUS 0 READY\n",
        delay,
    });
    let dispatcher = Dispatcher::new(store.clone(), transport);

    let mut config = BackupConfig::new(&registry_dir, dir.path().join("backups"));
    config.compress = false;
    config.max_backups = 2;
    let backup = BackupManager::new(config).unwrap();

    let app = build_app(AppState {
        dispatcher,
        backup,
        request_timeout,
    });
    Harness {
        app,
        store,
        _dir: dir,
    }
}

fn harness() -> Harness {
    harness_with(Duration::ZERO, Duration::from_secs(2))
}

async fn send(app: &Router, method: Method, uri: &str, body: Body) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .header("content-type", "application/json")
                .body(body)
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn command(app: &Router, body: Value) -> (StatusCode, Value) {
    send(app, Method::POST, "/", Body::from(body.to_string())).await
}

async fn add_printer(store: &InMemoryPrinterStore, status: PrinterStatus) -> u64 {
    store
        .put_one(NewPrinter {
            uid: None,
            name: "label-1".to_string(),
            ip: "10.0.0.5".to_string(),
            port: 9100,
            status,
            line: Some("L1".to_string()),
            description: None,
        })
        .await
        .unwrap()
        .id
}

#[tokio::test]
async fn health_and_home_respond() {
    let h = harness();
    let (status, body) = send(&h.app, Method::GET, "/health", Body::empty()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);

    let (status, body) = send(&h.app, Method::GET, "/", Body::empty()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn responses_carry_request_id() {
    let h = harness();
    let response = h
        .app
        .clone()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert!(response.headers().contains_key("x-request-id"));
    assert!(response.headers().contains_key("x-trace-id"));
}

#[tokio::test]
async fn malformed_body_is_bad_request() {
    let h = harness();
    let (status, body) = send(&h.app, Method::POST, "/", Body::from("{not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID.REQUEST");
}

#[tokio::test]
async fn unsupported_method_is_rejected() {
    let h = harness();
    let (status, body) = send(&h.app, Method::PUT, "/", Body::empty()).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["error"]["code"], "METHOD.NOT_ALLOWED");
}

#[tokio::test]
async fn registry_put_then_list() {
    let h = harness();
    let printer = json!({ "name": "label-1", "ip": "10.0.0.5", "port": 9100, "status": "in_the_work" });
    let (status, body) = command(
        &h.app,
        json!({ "cmdtype": "requesttodb", "cmdname": "PutPrinter", "cmdbody": printer.to_string() }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["kind"], "printer");
    assert_eq!(body["data"]["printer"]["id"], 1);

    let (status, body) = command(
        &h.app,
        json!({ "cmdtype": "requesttodb", "cmdname": "GetAllPrinters", "cmdbody": "" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["printers"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn unknown_registry_command_is_bad_request() {
    let h = harness();
    let (status, _) = command(
        &h.app,
        json!({ "cmdtype": "requesttodb", "cmdname": "DropTables", "cmdbody": "" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn device_request_with_both_identifiers_is_bad_request() {
    let h = harness();
    let (status, body) = command(
        &h.app,
        json!({
            "cmdtype": "sendcmdtoprinter",
            "cmdname": "GET_STATUS",
            "cmdbody": "",
            "uidline": "0f8fad5b-d9cb-469f-a165-70867728950e",
            "id": 1
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn unknown_printer_is_not_found() {
    let h = harness();
    let (status, body) = command(
        &h.app,
        json!({ "cmdtype": "sendcmdtoprinter", "cmdname": "GET_STATUS", "cmdbody": "", "id": 42 }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "RESOURCE.NOT_FOUND");
}

#[tokio::test]
async fn device_status_is_decoded() {
    let h = harness();
    let id = add_printer(&h.store, PrinterStatus::InTheWork).await;
    let (status, body) = command(
        &h.app,
        json!({ "cmdtype": "sendcmdtoprinter", "cmdname": "GET_STATUS", "cmdbody": "", "id": id }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["kind"], "device");
    assert_eq!(body["data"]["reply"]["kind"], "status");
    assert_eq!(body["data"]["reply"]["state"], "ready");
}

#[tokio::test]
async fn idle_printer_is_conflict() {
    let h = harness();
    let id = add_printer(&h.store, PrinterStatus::Idle).await;
    let (status, body) = command(
        &h.app,
        json!({
            "cmdtype": "sendcmdtoprinter",
            "cmdname": "GET_STATUS",
            "cmdbody": "",
            "id": id,
            "rmline": "L7"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "DEVICE.NOT_READY");
    assert!(body["error"]["message"].as_str().unwrap().contains("L7"));
}

#[tokio::test]
async fn expired_deadline_is_request_timeout() {
    let h = harness_with(Duration::ZERO, Duration::ZERO);
    let id = add_printer(&h.store, PrinterStatus::InTheWork).await;
    let (status, body) = command(
        &h.app,
        json!({ "cmdtype": "sendcmdtoprinter", "cmdname": "GET_STATUS", "cmdbody": "", "id": id }),
    )
    .await;
    assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
    assert_eq!(body["error"]["code"], "REQUEST.TIMEOUT");
}

#[tokio::test]
async fn started_device_command_is_not_cut_by_request_deadline() {
    let h = harness_with(Duration::from_millis(150), Duration::from_millis(50));
    let id = add_printer(&h.store, PrinterStatus::InTheWork).await;
    let (status, body) = command(
        &h.app,
        json!({ "cmdtype": "sendcmdtoprinter", "cmdname": "GET_STATUS", "cmdbody": "", "id": id }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
}

#[tokio::test]
async fn manual_backup_is_listed() {
    let h = harness();
    let (status, body) = send(&h.app, Method::POST, "/backup", Body::empty()).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["compressed"], false);
    let name = body["data"]["name"].as_str().unwrap().to_string();

    let (status, body) = send(&h.app, Method::GET, "/backups", Body::empty()).await;
    assert_eq!(status, StatusCode::OK);
    let snapshots = body["data"].as_array().unwrap();
    assert_eq!(snapshots.len(), 1);
    assert_eq!(snapshots[0]["name"], name.as_str());
}

#[tokio::test]
async fn retention_applies_to_manual_backups() {
    let h = harness();
    for _ in 0..3 {
        let (status, _) = send(&h.app, Method::POST, "/backup?nowait=true", Body::empty()).await;
        assert_eq!(status, StatusCode::OK);
    }
    let (_, body) = send(&h.app, Method::GET, "/backups", Body::empty()).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn metrics_are_exposed() {
    let h = harness();
    let (status, body) = send(&h.app, Method::GET, "/metrics", Body::empty()).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["backups_succeeded"].is_u64());
}
