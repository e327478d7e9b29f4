use axum::routing::get;
use axum::Router;

use crate::handlers::hooks;
use crate::state::AppState;

/// Mount hook trigger routes at root level (not under `/api/v1`).
///
/// ```text
/// GET|POST /hooks/{*name}  -> trigger_hook
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/hooks/{*name}",
        get(hooks::trigger_hook).post(hooks::trigger_hook),
    )
}
