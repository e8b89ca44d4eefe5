#![deny(warnings)]
#![deny(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use dotenv::dotenv;
use poem::{Server, listener::TcpListener};
use qkssh::ssh::{Config, SessionManager, SshConnector};
use tracing::info;

/// Time given to open connections to drain after a shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    let config = Config::from_env();

    // Initialize logging with proper tracing default
    let default_directive = if config.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(default_directive.parse()?),
        )
        .init();

    let manager = Arc::new(SessionManager::new(&config, Arc::new(SshConnector)));
    let app = qkssh::web::routes(manager.clone());

    let addr = format!("{}:{}", config.address, config.port);
    info!("Starting qkssh on {}", addr);
    info!(
        "Max connections: {}, connect timeout: {:?}, idle timeout: {:?}",
        config.max_connections, config.connect_timeout, config.session_timeout
    );

    Server::new(TcpListener::bind(addr))
        .name("qkssh")
        .run_with_graceful_shutdown(app, shutdown_signal(), Some(SHUTDOWN_GRACE))
        .await?;

    manager.shutdown().await;
    info!("qkssh stopped");
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
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
    info!("Shutdown signal received");
}
