#![allow(dead_code)]

use std::path::Path;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use hookd_api::config::ServerConfig;
use hookd_api::router::build_app_router;
use hookd_api::state::AppState;

/// Build a test `ServerConfig` with safe defaults, serving hooks from
/// `scripts_dir`.
///
/// Uses a single worker, an unsigned hook endpoint, and no output logging.
pub fn test_config(scripts_dir: &Path) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        nb_workers: 1,
        queue_capacity: 16,
        hook_timeout_secs: 5,
        scripts_dir: scripts_dir.to_path_buf(),
        hook_log_dir: None,
        hook_secret: None,
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        listener_shutdown_timeout_secs: 2,
    }
}

/// Build the full application router around a started dispatcher.
///
/// Returns the state too so tests can inspect or shut down the dispatcher.
pub fn build_test_app(config: ServerConfig) -> (Router, AppState) {
    let state = AppState::new(config);
    state
        .dispatcher
        .start(state.config.nb_workers)
        .expect("start dispatcher");
    (build_app_router(state.clone()), state)
}

/// Write an executable shell hook named `<name>.sh` below `dir`.
pub fn write_hook(dir: &Path, name: &str, body: &str) {
    let path = dir.join(format!("{name}.sh"));
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create hook dir");
    }
    std::fs::write(&path, format!("#!/bin/bash\n{body}")).expect("write hook");
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, Body::empty(), &[]).await
}

pub async fn post(app: Router, uri: &str, body: &str, headers: &[(&str, &str)]) -> Response<Body> {
    send(app, Method::POST, uri, Body::from(body.to_string()), headers).await
}

pub async fn send(
    app: Router,
    method: Method,
    uri: &str,
    body: Body,
    headers: &[(&str, &str)],
) -> Response<Body> {
    let mut request = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        request = request.header(*name, *value);
    }
    app.oneshot(request.body(body).unwrap()).await.unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Poll `GET /api/v1/jobs/{id}` until the job leaves `pending`/`running`.
pub async fn wait_for_job(app: &Router, job_id: &str) -> serde_json::Value {
    for _ in 0..100 {
        let response = get(app.clone(), &format!("/api/v1/jobs/{job_id}")).await;
        let json = body_json(response).await;
        let status = json["data"]["status"].as_str().unwrap_or_default().to_string();
        if status != "pending" && status != "running" {
            return json["data"].clone();
        }
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }
    panic!("job {job_id} did not finish in time");
}
