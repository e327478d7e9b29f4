use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hookd_api::config::ServerConfig;
use hookd_api::router::build_app_router;
use hookd_api::shutdown::{ShutdownCoordinator, ShutdownDeadlines};
use hookd_api::signals;
use hookd_api::state::AppState;

/// Webhook trigger server. Configuration is read from the environment.
#[derive(Debug, Parser)]
#[command(version)]
struct Cli {}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Handles `--version` and `--help` before anything else starts.
    let _cli = Cli::parse();
    dotenvy::dotenv().ok();

    // --- Tracing ---
    init_tracing();

    // --- Configuration ---
    let config = ServerConfig::from_env().context("Invalid configuration")?;
    tracing::info!(
        host = %config.host,
        port = config.port,
        workers = config.nb_workers,
        scripts_dir = %config.scripts_dir.display(),
        "Loaded server configuration",
    );

    // --- Dispatcher ---
    let state = AppState::new(config.clone());
    state
        .dispatcher
        .start(config.nb_workers)
        .context("Failed to start dispatcher")?;

    // --- Shutdown wiring ---
    let signals = signals::listen().context("Failed to install signal handlers")?;
    let coordinator = ShutdownCoordinator::new(
        state.dispatcher.clone(),
        ShutdownDeadlines {
            overall: config.shutdown_timeout(),
            listener: config.listener_shutdown_timeout(),
        },
    );

    // --- Start server ---
    let addr = config
        .listen_addr()
        .await
        .with_context(|| format!("Invalid HOST address '{}'", config.host))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;
    tracing::info!(%addr, "Starting server");

    let app = build_app_router(state);
    let stop_accepting = coordinator.listener_signal();
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(stop_accepting)
            .await
    });

    // --- Graceful shutdown ---
    let report = coordinator
        .coordinate(signals, server)
        .await
        .context("Graceful shutdown failed")?;
    tracing::info!(
        completed = report.completed,
        failed = report.failed,
        "Server stopped",
    );

    Ok(())
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` selects the filter; `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "hookd_api=debug,hookd_worker=debug,tower_http=debug".into());
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
