use std::sync::Arc;

use hookd_core::HookResolver;
use hookd_worker::Dispatcher;

use crate::config::ServerConfig;
use crate::status::JobStatusBoard;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration, read once at startup.
    pub config: Arc<ServerConfig>,
    /// The worker pool every accepted hook is submitted to.
    pub dispatcher: Arc<Dispatcher>,
    /// Maps hook names onto scripts below `SCRIPTS_DIR`.
    pub resolver: Arc<HookResolver>,
    /// Per-job status records, also the dispatcher's reporter.
    pub status_board: Arc<JobStatusBoard>,
}

impl AppState {
    /// Wire up the state for `config`. The dispatcher is created but not
    /// started.
    pub fn new(config: ServerConfig) -> Self {
        let status_board = Arc::new(JobStatusBoard::new());
        let dispatcher = Arc::new(Dispatcher::with_capacity(
            config.queue_capacity(),
            status_board.clone(),
        ));
        let resolver = Arc::new(HookResolver::new(config.scripts_dir.clone()));

        Self {
            config: Arc::new(config),
            dispatcher,
            resolver,
            status_board,
        }
    }
}
