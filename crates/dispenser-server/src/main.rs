use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use dispenser_core::{PersistenceHook, Registry};
use dispenser_proto::JsonSnapshot;
use dispenser_server::config::{CliArgs, ServerConfig};
use dispenser_server::connection;
use dispenser_server::telemetry::init_telemetry;
use tokio::net::TcpListener;
use tokio::signal;

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = ServerConfig::try_from(args)?;

    init_telemetry();

    std::fs::create_dir_all(&config.data_dir)?;
    let snapshot_path = Path::new(&config.data_dir).join("dispensers.json");
    let snapshot = Arc::new(JsonSnapshot::load(&snapshot_path)?);

    let registry = Arc::new(Registry::new(snapshot.clone(), config.durability));
    registry.load(snapshot.entries())?;

    let listener = TcpListener::bind(&config.listen).await?;
    tracing::info!(addr = %config.listen, data_dir = %config.data_dir, "dispenser-server listening");

    let autosave = tokio::spawn(autosave_loop(snapshot.clone(), config.autosave_interval));

    run_accept_loop(listener, registry.clone()).await;

    autosave.abort();
    shutdown(registry, snapshot, config.shutdown_timeout).await;
    Ok(())
}

async fn run_accept_loop(listener: TcpListener, registry: Arc<Registry>) {
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((socket, _addr)) => {
                        let registry = registry.clone();
                        tokio::spawn(connection::handle_connection(socket, registry));
                    }
                    Err(err) => tracing::warn!(%err, "failed to accept connection"),
                }
            }
            () = shutdown_signal() => {
                tracing::info!("shutdown signal received, no longer accepting connections");
                break;
            }
        }
    }
}

async fn autosave_loop(snapshot: Arc<JsonSnapshot>, interval: std::time::Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.tick().await;
    loop {
        ticker.tick().await;
        if let Err(err) = snapshot.flush() {
            tracing::warn!(%err, "autosave flush failed");
        }
    }
}

async fn shutdown(registry: Arc<Registry>, snapshot: Arc<JsonSnapshot>, timeout: std::time::Duration) {
    let graceful = tokio::task::spawn_blocking(move || registry.shutdown());
    if tokio::time::timeout(timeout, graceful).await.is_err() {
        tracing::warn!("graceful shutdown exceeded its timeout, proceeding anyway");
    }
    if let Err(err) = snapshot.flush() {
        tracing::error!(%err, "final flush on shutdown failed");
    }
    tracing::info!("dispenser-server shut down");
}

async fn shutdown_signal() {
    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    tokio::select! {
        () = ctrl_c => tracing::info!("received Ctrl+C"),
        () = terminate => tracing::info!("received SIGTERM"),
    }
}
