//! Handlers for the `/jobs` resource: status and output of triggered hooks.

use axum::extract::{Path, State};
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use axum::Json;
use hookd_core::CoreError;
use hookd_worker::script::log_file_path;
use hookd_worker::JobId;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

fn parse_job_id(raw: &str) -> AppResult<JobId> {
    raw.parse()
        .map_err(|_| AppError::BadRequest(format!("'{raw}' is not a valid job id")))
}

/// GET /api/v1/jobs/{id}
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let job_id = parse_job_id(&id)?;
    let record = state
        .status_board
        .get(job_id)
        .await
        .ok_or(CoreError::NotFound { entity: "Job", id })?;

    Ok(Json(DataResponse { data: record }))
}

/// GET /api/v1/jobs/{id}/logs
///
/// Returns the job's output log as plain text. 404 when output logging is
/// disabled or the job has not written a log yet.
pub async fn get_job_logs(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let job_id = parse_job_id(&id)?;
    let not_found = || CoreError::NotFound {
        entity: "Job log",
        id: id.clone(),
    };

    let dir = state.config.hook_log_dir.as_ref().ok_or_else(not_found)?;
    let path = log_file_path(dir, job_id);
    let contents = match tokio::fs::read_to_string(&path).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(not_found().into()),
        Err(e) => {
            return Err(AppError::InternalError(format!(
                "reading {}: {e}",
                path.display()
            )))
        }
    };

    Ok(([(CONTENT_TYPE, "text/plain; charset=utf-8")], contents))
}
