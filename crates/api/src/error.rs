use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use hookd_core::error::CoreError;
use hookd_worker::DispatchError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] and [`DispatchError`] and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `hookd_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The dispatcher refused the job.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} '{id}' not found"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Unauthorized(msg) => {
                    (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
                }
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    internal()
                }
            },

            // --- Dispatcher errors ---
            AppError::Dispatch(err) => classify_dispatch_error(err),

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                internal()
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Classify a dispatcher error into an HTTP status, error code, and message.
///
/// - Closed or not-yet-started dispatchers map to 503.
/// - A full queue maps to 429 so callers back off and retry.
/// - Lifecycle errors never reach handlers in practice and map to 500.
fn classify_dispatch_error(err: &DispatchError) -> (StatusCode, &'static str, String) {
    match err {
        DispatchError::DispatcherClosed | DispatchError::NotStarted => (
            StatusCode::SERVICE_UNAVAILABLE,
            "DISPATCHER_CLOSED",
            "Server is shutting down and not accepting new hooks".to_string(),
        ),
        DispatchError::QueueFull { .. } => (
            StatusCode::TOO_MANY_REQUESTS,
            "QUEUE_FULL",
            err.to_string(),
        ),
        other => {
            tracing::error!(error = %other, "Dispatcher error");
            internal()
        }
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}
