//! Relay Server Binary
//!
//! Starts the chat relay and order book ticker.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin relay-server
//! ```
//!
//! # Environment Variables
//!
//! - `RELAY_PORT`: listen port (default: 3000)
//! - `RELAY_BIND_ADDR`: listen address (default: 0.0.0.0)
//! - `RELAY_TICK_INTERVAL_SECS`: order book tick interval (default: 5)
//! - `RELAY_READ_ERROR_BACKOFF_MS`: pause after a chat read error (default: 100)
//! - `OTEL_ENABLED`: export traces over OTLP (default: false)
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (default: <http://localhost:4317>)
//! - `OTEL_SERVICE_NAME`: service name (default: relay-server)
//! - `RUST_LOG`: log filter (default: info)

use relay_server::infrastructure::telemetry;
use relay_server::{RelayConfig, RelayServer, init_metrics};
use tokio::signal;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    let telemetry_guard = telemetry::init();

    tracing::info!(
        span_export = telemetry_guard.is_exporting(),
        "Starting relay server"
    );

    let _metrics_handle = init_metrics();

    let config = RelayConfig::from_env()?;
    log_config(&config);

    let shutdown_token = CancellationToken::new();
    let server = RelayServer::new(&config, shutdown_token.clone());

    let mut server_task = tokio::spawn(server.run());

    tokio::select! {
        () = await_shutdown() => {
            shutdown_token.cancel();
            server_task.await??;
        }
        result = &mut server_task => {
            shutdown_token.cancel();
            result??;
        }
    }

    tracing::info!("Relay server stopped");
    Ok(())
}

/// Log the parsed configuration.
fn log_config(config: &RelayConfig) {
    tracing::info!(
        addr = %config.server.socket_addr(),
        tick_interval_secs = config.session.tick_interval.as_secs(),
        read_error_backoff_ms = u64::try_from(config.session.read_error_backoff.as_millis())
            .unwrap_or(u64::MAX),
        "Configuration loaded"
    );
}

/// Load the nearest `.env`, searching upward from the working directory.
fn load_dotenv() {
    let Ok(cwd) = std::env::current_dir() else {
        return;
    };
    if let Some(path) = cwd
        .ancestors()
        .map(|dir| dir.join(".env"))
        .find(|path| path.is_file())
    {
        let _ = dotenvy::from_path(&path);
    }
}

/// Resolve on SIGINT or SIGTERM.
///
/// A signal whose handler cannot be installed never resolves.
async fn await_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT, draining connections");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, draining connections");
        }
    }
}
