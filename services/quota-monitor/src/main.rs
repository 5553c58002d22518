use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use storage_quota_monitor::{create_router, ApiState, QuotaMonitor, QuotaMonitorConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let config = QuotaMonitorConfig::from_env()?;
    init_tracing(&config.log_level)?;

    let host = config.server_host.clone();
    let port = config.server_port;

    info!(
        host = %host,
        port,
        per_caller_limit = config.per_caller_limit,
        global_limit = config.global_limit,
        window_secs = config.window_secs,
        "starting storage quota monitor"
    );

    let monitor = QuotaMonitor::new(config.policy());
    let _cleanup_task = monitor.start_cleanup_task(config.cleanup_interval());

    let state = Arc::new(ApiState::new(monitor, config));
    let router = create_router(Arc::clone(&state));
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    let listener = TcpListener::bind(addr).await?;

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("storage quota monitor shutting down");
    Ok(())
}

fn init_tracing(default_level: &str) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|err| anyhow::anyhow!(err))?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install CTRL+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
