//! 打印网关进程入口：配置 → 存储 → 分发器 → 备份 → HTTP 服务 → 优雅退出。

use printcomm_api::{AppState, build_app};
use printcomm_backup::{BackupConfig, BackupManager};
use printcomm_config::AppConfig;
use printcomm_dispatch::{Dispatcher, DispatcherConfig};
use printcomm_protocol::TcpTransport;
use printcomm_storage::FilePrinterStore;
use printcomm_telemetry::init_tracing;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载本地 .env（如存在），便于直接 cargo run 启动
    dotenvy::dotenv().ok();
    // 从环境变量加载运行配置
    let config = AppConfig::from_env()?;
    // 初始化结构化日志
    init_tracing(&config.log_level);

    // 注册表目录即备份源
    let store = Arc::new(FilePrinterStore::open(&config.registry_dir).await?);
    let dispatcher = Dispatcher::new_with_config(
        store,
        Arc::new(TcpTransport::new()),
        DispatcherConfig {
            printer_timeout: Duration::from_millis(config.printer_timeout_ms),
        },
    );

    let mut backup_config = BackupConfig::new(&config.registry_dir, &config.backup_dir);
    backup_config.schedule = config.backup_schedule.clone();
    backup_config.max_backups = config.backup_max_count;
    backup_config.compress = config.backup_compress;
    backup_config.stop_grace = Duration::from_millis(config.backup_stop_grace_ms);
    let backup = BackupManager::new(backup_config)?;
    if config.backup_enabled {
        backup.start_scheduled_backups()?;
    }
    // 启动时先做一次快照；失败不阻止服务启动
    if let Err(err) = backup.perform_backup().await {
        warn!(target: "printcomm.api", error = %err, "startup_backup_failed");
    }

    let state = AppState {
        dispatcher,
        backup: backup.clone(),
        request_timeout: Duration::from_millis(config.request_timeout_ms),
    };
    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind(&config.http_addr).await?;
    info!(target: "printcomm.api", addr = %config.http_addr, "http_listening");

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.wait_for(|stop| *stop).await;
            })
            .await
    });

    shutdown_signal().await;
    info!(target: "printcomm.api", "shutdown_started");

    // 退出前最后一次快照
    if let Err(err) = backup.perform_backup().await {
        warn!(target: "printcomm.api", error = %err, "shutdown_backup_failed");
    }

    let _ = shutdown_tx.send(true);
    match tokio::time::timeout(Duration::from_millis(config.shutdown_timeout_ms), server).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(err))) => error!(target: "printcomm.api", error = %err, "http_server_failed"),
        Ok(Err(err)) => error!(target: "printcomm.api", error = %err, "http_server_task_failed"),
        Err(_) => warn!(
            target: "printcomm.api",
            timeout_ms = config.shutdown_timeout_ms,
            "http_drain_timeout"
        ),
    }

    backup.stop().await;
    info!(target: "printcomm.api", "shutdown_complete");
    Ok(())
}

/// 等待 Ctrl+C 或 SIGTERM。
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(target: "printcomm.api", error = %err, "ctrl_c_handler_failed");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(target: "printcomm.api", error = %err, "sigterm_handler_failed");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
