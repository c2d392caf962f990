use std::sync::Arc;

use progressor::api::task_routes;
use progressor::config::ServiceConfig;
use progressor::queue::{Dispatcher, TaskStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let mut config = ServiceConfig::from_env();

    // First CLI argument, when present, sets the worker pool size.
    if let Some(arg) = std::env::args().nth(1) {
        match arg.parse::<usize>() {
            Ok(workers) => config.workers = workers,
            Err(_) => {
                eprintln!("Usage: progressor [workers]");
                eprintln!("  workers must be an integer >= 1 (got '{arg}')");
                std::process::exit(1);
            }
        }
    }

    if let Err(e) = config.validate() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    eprintln!("progressor v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("  Workers: {}", config.workers);
    eprintln!("  API: http://0.0.0.0:{}/tasks", config.port);

    let store = TaskStore::new();
    let dispatcher = Arc::new(Dispatcher::start(Arc::clone(&store), config.workers));

    let app = task_routes(Arc::clone(&store), Arc::clone(&dispatcher));

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    tracing::info!(port = config.port, workers = config.workers, "HTTP server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Workers exit at their next suspension point; in-memory state is lost
    // by design.
    dispatcher.shutdown();
    tracing::info!("Shut down");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for ctrl-c");
    }
}
