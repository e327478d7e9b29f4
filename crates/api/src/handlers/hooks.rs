//! Handlers for hook triggers (`/hooks/{*name}`).
//!
//! A trigger is accepted as soon as its job is queued; the script runs later
//! on the worker pool. Callers follow up through the returned `status_url`.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use hookd_core::hooks::validate_hook_name;
use hookd_core::signature::verify_signature;
use hookd_core::CoreError;
use hookd_worker::{Job, JobId, ScriptJobHandler};
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Header carrying the `sha256=<hex>` HMAC of the request body.
pub const SIGNATURE_HEADER: &str = "x-hook-signature";

/// Header overriding the default per-job timeout, in seconds.
pub const TIMEOUT_HEADER: &str = "x-hook-timeout";

/// Prefix of the environment variables built from query parameters. Callers
/// never name a variable the shell or the dynamic loader reads.
pub const QUERY_ENV_PREFIX: &str = "HOOK_QUERY_";

/// Body of a `202 Accepted` trigger response.
#[derive(Debug, Serialize)]
pub struct TriggerAccepted {
    pub job_id: JobId,
    pub hook: String,
    pub status_url: String,
}

/// POST|GET /hooks/{*name}
///
/// Verify the signature when a secret is configured, resolve the hook, and
/// queue a job running the hook's script. Returns 202 with the job id.
pub async fn trigger_hook(
    State(state): State<AppState>,
    method: Method,
    Path(name): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<impl IntoResponse> {
    validate_hook_name(&name)?;

    // Authenticate before touching the scripts directory.
    if let Some(secret) = &state.config.hook_secret {
        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| CoreError::Unauthorized("missing hook signature".to_string()))?;
        verify_signature(secret, &body, signature)?;
    }

    let script = state.resolver.resolve(&name).await?;

    let timeout = match headers.get(TIMEOUT_HEADER) {
        Some(value) => parse_timeout(value.to_str().ok())?,
        None => state.config.hook_timeout(),
    };

    let mut handler = ScriptJobHandler::new(script).with_default_timeout(timeout);
    if let Some(dir) = &state.config.hook_log_dir {
        handler = handler.with_log_dir(dir.clone());
    }

    let job = Job::builder(name.clone(), Arc::new(handler))
        .payload(parse_payload(&body))
        .env_vars(params.into_iter().map(|(k, v)| (env_var_name(&k), v)))
        .env_var("HOOK_METHOD", method.as_str())
        .timeout(timeout)
        .build();
    let job_id = job.id();

    state.status_board.record_submitted(&job).await;
    if let Err(e) = state.dispatcher.submit(job) {
        state.status_board.forget(job_id).await;
        return Err(e.into());
    }

    tracing::info!(job_id = %job_id, hook = %name, method = %method, "Hook triggered");

    Ok((
        StatusCode::ACCEPTED,
        Json(DataResponse {
            data: TriggerAccepted {
                job_id,
                status_url: format!("/api/v1/jobs/{job_id}"),
                hook: name,
            },
        }),
    ))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Interpret the request body as the job payload.
///
/// JSON bodies are passed through, other text is wrapped as `{"raw": ...}`,
/// and an empty body becomes `null`.
pub fn parse_payload(body: &[u8]) -> serde_json::Value {
    if body.iter().all(u8::is_ascii_whitespace) {
        return serde_json::Value::Null;
    }
    serde_json::from_slice(body).unwrap_or_else(|_| {
        serde_json::json!({ "raw": String::from_utf8_lossy(body) })
    })
}

/// Turn a query parameter name into a shell-safe variable name under
/// [`QUERY_ENV_PREFIX`]: upper-cased, with anything outside `[A-Z0-9_]`
/// replaced by `_`.
pub fn env_var_name(key: &str) -> String {
    let mut name = String::with_capacity(QUERY_ENV_PREFIX.len() + key.len());
    name.push_str(QUERY_ENV_PREFIX);
    name.extend(key.chars().map(|c| {
        if c.is_ascii_alphanumeric() {
            c.to_ascii_uppercase()
        } else {
            '_'
        }
    }));
    name
}

fn parse_timeout(value: Option<&str>) -> Result<Duration, AppError> {
    value
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
        .ok_or_else(|| {
            AppError::BadRequest(format!(
                "{TIMEOUT_HEADER} must be a positive number of seconds"
            ))
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
