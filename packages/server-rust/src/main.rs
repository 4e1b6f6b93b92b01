use anyhow::Context as _;
use clap::Parser;
use tracing::info;

use notes_server::config::load_dotenv;
use notes_server::telemetry::init_tracing;
use notes_server::{storage, NetworkModule, ServerArgs};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Before parsing, so `.env` values reach clap's `env` fallbacks.
    let dotenv = load_dotenv();
    let args = ServerArgs::parse();
    init_tracing(args.log_format);

    match dotenv {
        Ok(Some(path)) => info!(path = %path.display(), "loaded environment file"),
        Ok(None) => {}
        Err(err) => tracing::warn!(error = %err, "ignoring unreadable .env file"),
    }

    let store = storage::open(args.store, &args.database_config())
        .await
        .context("failed to open note store")?;
    store
        .initialize()
        .await
        .context("failed to initialize note store")?;

    let mut module = NetworkModule::new(args.network_config(), store);
    let port = module.start().await?;
    info!(port, store = ?args.store, "notes server started");

    module.serve(shutdown_signal()).await
}

/// Resolves on Ctrl+C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl+C");
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
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
