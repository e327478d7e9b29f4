//! Integration tests for hook triggers and job status endpoints.

mod common;

use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, StatusCode};
use hookd_core::signature::sign_payload;

use common::*;

// ---------------------------------------------------------------------------
// Test: POST /hooks/{name} queues the script and it succeeds
// ---------------------------------------------------------------------------

#[tokio::test]
async fn trigger_returns_202_and_job_succeeds() {
    let scripts = tempfile::tempdir().unwrap();
    write_hook(scripts.path(), "deploy/site", "echo deployed\n");
    let (app, _state) = build_test_app(test_config(scripts.path()));

    let response = post(app.clone(), "/hooks/deploy/site", r#"{"ref":"main"}"#, &[]).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let json = body_json(response).await;
    let job_id = json["data"]["job_id"].as_str().unwrap().to_string();
    assert_eq!(json["data"]["hook"], "deploy/site");
    assert_eq!(json["data"]["status_url"], format!("/api/v1/jobs/{job_id}"));

    let record = wait_for_job(&app, &job_id).await;
    assert_eq!(record["status"], "succeeded");
    assert_eq!(record["exit_code"], 0);
    assert_eq!(record["worker_id"], 0);
    assert!(record["finished_at"].is_string());
}

// ---------------------------------------------------------------------------
// Test: payload, query parameters, and method reach the script
// ---------------------------------------------------------------------------

#[tokio::test]
async fn script_sees_payload_query_and_method() {
    let scripts = tempfile::tempdir().unwrap();
    let logs = tempfile::tempdir().unwrap();
    write_hook(
        scripts.path(),
        "echo",
        "read -r body\necho \"payload=$body\"\necho \"branch=$HOOK_QUERY_BRANCH method=$HOOK_METHOD name=$HOOK_NAME\"\n",
    );
    let mut config = test_config(scripts.path());
    config.hook_log_dir = Some(logs.path().to_path_buf());
    let (app, _state) = build_test_app(config);

    let response = post(app.clone(), "/hooks/echo?branch=main", r#"{"n":1}"#, &[]).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let job_id = body_json(response).await["data"]["job_id"]
        .as_str()
        .unwrap()
        .to_string();

    let record = wait_for_job(&app, &job_id).await;
    assert_eq!(record["status"], "succeeded");

    let response = get(app, &format!("/api/v1/jobs/{job_id}/logs")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let log = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(log.contains(r#"payload={"n":1}"#), "log was: {log}");
    assert!(log.contains("branch=main method=POST name=echo"), "log was: {log}");
}

// ---------------------------------------------------------------------------
// Test: query parameters cannot set variables bash itself reads
// ---------------------------------------------------------------------------

#[tokio::test]
async fn query_parameters_stay_in_their_namespace() {
    let scripts = tempfile::tempdir().unwrap();
    let logs = tempfile::tempdir().unwrap();
    let outside = tempfile::tempdir().unwrap();
    let sourced = outside.path().join("startup.sh");
    std::fs::write(&sourced, "echo SOURCED-AT-STARTUP\n").unwrap();
    write_hook(
        scripts.path(),
        "env",
        "echo \"query=$HOOK_QUERY_BASH_ENV\"\ncat /dev/null\n",
    );
    let mut config = test_config(scripts.path());
    config.hook_log_dir = Some(logs.path().to_path_buf());
    let (app, _state) = build_test_app(config);

    let uri = format!(
        "/hooks/env?bash_env={}&path=/nonexistent&ld_preload=/nonexistent.so",
        sourced.display()
    );
    let response = post(app.clone(), &uri, "", &[]).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let job_id = body_json(response).await["data"]["job_id"]
        .as_str()
        .unwrap()
        .to_string();

    let record = wait_for_job(&app, &job_id).await;
    assert_eq!(record["status"], "succeeded", "record was: {record}");

    let response = get(app, &format!("/api/v1/jobs/{job_id}/logs")).await;
    let log = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(!log.contains("SOURCED-AT-STARTUP"), "log was: {log}");
    assert!(
        log.contains(&format!("query={}", sourced.display())),
        "log was: {log}"
    );
}

#[tokio::test]
async fn get_requests_also_trigger() {
    let scripts = tempfile::tempdir().unwrap();
    write_hook(scripts.path(), "ping", "exit 0\n");
    let (app, _state) = build_test_app(test_config(scripts.path()));

    let response = send(app, Method::GET, "/hooks/ping", Body::empty(), &[]).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
}

// ---------------------------------------------------------------------------
// Test: hook lookup failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_hook_returns_404() {
    let scripts = tempfile::tempdir().unwrap();
    let (app, state) = build_test_app(test_config(scripts.path()));

    let response = post(app, "/hooks/missing", "", &[]).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "NOT_FOUND");
    assert_eq!(state.dispatcher.stats().submitted, 0);
}

#[tokio::test]
async fn invalid_hook_name_returns_400() {
    let scripts = tempfile::tempdir().unwrap();
    let (app, _state) = build_test_app(test_config(scripts.path()));

    let response = post(app, "/hooks/bad%20name", "", &[]).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

// ---------------------------------------------------------------------------
// Test: signature verification
// ---------------------------------------------------------------------------

#[tokio::test]
async fn signed_hooks_require_valid_signature() {
    let scripts = tempfile::tempdir().unwrap();
    write_hook(scripts.path(), "secure", "exit 0\n");
    let mut config = test_config(scripts.path());
    config.hook_secret = Some("s3cret".into());
    let (app, _state) = build_test_app(config);
    let body = r#"{"ref":"main"}"#;

    let missing = post(app.clone(), "/hooks/secure", body, &[]).await;
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(missing).await["code"], "UNAUTHORIZED");

    let wrong = sign_payload("other", body.as_bytes());
    let response = post(app.clone(), "/hooks/secure", body, &[("x-hook-signature", wrong.as_str())]).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let valid = sign_payload("s3cret", body.as_bytes());
    let response = post(app, "/hooks/secure", body, &[("x-hook-signature", valid.as_str())]).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
}

// ---------------------------------------------------------------------------
// Test: job outcomes are visible on the status endpoint
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failing_script_is_reported_as_failed() {
    let scripts = tempfile::tempdir().unwrap();
    write_hook(scripts.path(), "broken", "echo nope >&2\nexit 4\n");
    let (app, _state) = build_test_app(test_config(scripts.path()));

    let response = post(app.clone(), "/hooks/broken", "", &[]).await;
    let job_id = body_json(response).await["data"]["job_id"]
        .as_str()
        .unwrap()
        .to_string();

    let record = wait_for_job(&app, &job_id).await;
    assert_eq!(record["status"], "failed");
    assert_eq!(record["exit_code"], 4);
    assert_eq!(record["error"], "hook exited with code 4");
}

#[tokio::test]
async fn timeout_header_overrides_default() {
    let scripts = tempfile::tempdir().unwrap();
    write_hook(scripts.path(), "slow", "sleep 10\n");
    let (app, _state) = build_test_app(test_config(scripts.path()));

    let response = post(app.clone(), "/hooks/slow", "", &[("x-hook-timeout", "1")]).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let job_id = body_json(response).await["data"]["job_id"]
        .as_str()
        .unwrap()
        .to_string();

    let record = wait_for_job(&app, &job_id).await;
    assert_eq!(record["status"], "timed_out");
}

#[tokio::test]
async fn invalid_timeout_header_returns_400() {
    let scripts = tempfile::tempdir().unwrap();
    write_hook(scripts.path(), "ping", "exit 0\n");
    let (app, _state) = build_test_app(test_config(scripts.path()));

    let response = post(app, "/hooks/ping", "", &[("x-hook-timeout", "never")]).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn unknown_job_returns_404_and_bad_id_returns_400() {
    let scripts = tempfile::tempdir().unwrap();
    let (app, _state) = build_test_app(test_config(scripts.path()));

    let unknown = get(
        app.clone(),
        "/api/v1/jobs/01890a5d-ac96-774b-bcce-b302099a8057",
    )
    .await;
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);

    let bad = get(app, "/api/v1/jobs/not-a-uuid").await;
    assert_eq!(bad.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn logs_return_404_when_logging_disabled() {
    let scripts = tempfile::tempdir().unwrap();
    write_hook(scripts.path(), "ping", "exit 0\n");
    let (app, _state) = build_test_app(test_config(scripts.path()));

    let response = post(app.clone(), "/hooks/ping", "", &[]).await;
    let job_id = body_json(response).await["data"]["job_id"]
        .as_str()
        .unwrap()
        .to_string();
    wait_for_job(&app, &job_id).await;

    let response = get(app, &format!("/api/v1/jobs/{job_id}/logs")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Test: dispatcher back-pressure and shutdown surface as HTTP errors
// ---------------------------------------------------------------------------

#[tokio::test]
async fn full_queue_returns_429() {
    let scripts = tempfile::tempdir().unwrap();
    write_hook(scripts.path(), "slow", "sleep 2\n");
    let mut config = test_config(scripts.path());
    config.queue_capacity = 1;
    let (app, state) = build_test_app(config);

    let first = post(app.clone(), "/hooks/slow", "", &[]).await;
    assert_eq!(first.status(), StatusCode::ACCEPTED);
    tokio::time::sleep(Duration::from_millis(200)).await;

    let second = post(app.clone(), "/hooks/slow", "", &[]).await;
    assert_eq!(second.status(), StatusCode::ACCEPTED);

    let third = post(app, "/hooks/slow", "", &[]).await;
    assert_eq!(third.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body_json(third).await["code"], "QUEUE_FULL");
    assert_eq!(state.dispatcher.stats().submitted, 2);
}

#[tokio::test]
async fn trigger_after_shutdown_returns_503() {
    let scripts = tempfile::tempdir().unwrap();
    write_hook(scripts.path(), "ping", "exit 0\n");
    let (app, state) = build_test_app(test_config(scripts.path()));
    state
        .dispatcher
        .shutdown(Duration::from_secs(1))
        .await
        .expect("clean shutdown");

    let response = post(app, "/hooks/ping", "", &[]).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["code"], "DISPATCHER_CLOSED");
    assert!(state.status_board.is_empty().await);
}
