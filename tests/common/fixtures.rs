//! Mock service and replay file fixtures

use std::path::{Path, PathBuf};
use std::time::Duration;

use replay_upload::{Config, PollingConfig, ServerConfig};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Size of a replay that passes the default size rules
pub const VALID_REPLAY_SIZE: usize = 300_000;

/// Config pointed at `server`, with polling shrunk so tests finish quickly
pub fn fast_config(server: &MockServer) -> Config {
    Config {
        server: ServerConfig {
            base_url: format!("{}/api/", server.uri()),
            request_timeout: Duration::from_secs(5),
            ..Default::default()
        },
        polling: PollingConfig {
            interval: Duration::from_millis(20),
            timeout: Duration::from_millis(300),
        },
        ..Default::default()
    }
}

/// Write a replay of `size` bytes into `dir`
pub fn write_replay(dir: &Path, name: &str, size: usize) -> PathBuf {
    let path = dir.join(name);
    let content: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
    std::fs::write(&path, content).expect("Failed to write replay fixture");
    path
}

/// Answer `auth/status` with the given flag and token
pub async fn mount_session(server: &MockServer, authenticated: bool, csrf_token: &str) {
    Mock::given(method("GET"))
        .and(path("/api/auth/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "authenticated": authenticated,
            "csrf_token": csrf_token,
        })))
        .mount(server)
        .await;
}

/// Accept every upload and echo `filename` as the stored identifier
pub async fn mount_upload_created(server: &MockServer, filename: &str) {
    Mock::given(method("POST"))
        .and(path("/api/upload"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "filename": filename })))
        .mount(server)
        .await;
}

/// Answer status queries for `filename` with `status`, at most `times` times when given
pub async fn mount_status(server: &MockServer, filename: &str, status: &str, times: Option<u64>) {
    let mock = Mock::given(method("GET"))
        .and(path("/api/upload/status"))
        .and(query_param("filename", filename))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": status })));
    let mock = match times {
        Some(n) => mock.up_to_n_times(n),
        None => mock,
    };
    mock.mount(server).await;
}

/// Number of requests the server received on `route`
pub async fn requests_to(server: &MockServer, route: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == route)
        .count()
}
