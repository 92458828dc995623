//! Common test utilities for actions-top integration tests

#![allow(dead_code)]

use actions_top::{Config, RetryConfig};
use serde_json::{Value, json};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Organization used by every test
pub const ORG: &str = "acme";

/// Config pointing at a mock server, retries disabled
pub fn config_for(server: &MockServer) -> Config {
    let mut config = Config::default();
    config.api.base_url = server.uri();
    config.api.token = Some("integration-token".to_string());
    config.poll.max_concurrent_requests = 4;
    config.poll.fetch_all_groups = true;
    config.retry = RetryConfig::disabled();
    config
}

/// Run payload as returned by the workflow runs endpoint
pub fn run_json(id: u64, status: &str, conclusion: Option<&str>, started: &str) -> Value {
    json!({
        "id": id,
        "name": "CI",
        "status": status,
        "conclusion": conclusion,
        "run_started_at": started,
        "display_title": format!("Run number {id}"),
        "html_url": format!("https://github.com/{ORG}/repo/actions/runs/{id}"),
    })
}

/// Serve `repos` as the single page of the organization listing
pub async fn mount_repos(server: &MockServer, repos: Value) {
    Mock::given(method("GET"))
        .and(path(format!("/orgs/{ORG}/repos")))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(repos))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/orgs/{ORG}/repos")))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(server)
        .await;
}

/// Serve `runs` as page 1 (then an empty page 2) for one repo and status
pub async fn mount_runs(server: &MockServer, repo: &str, status: &str, runs: Vec<Value>) {
    let runs_path = format!("/repos/{ORG}/{repo}/actions/runs");
    Mock::given(method("GET"))
        .and(path(runs_path.clone()))
        .and(query_param("status", status))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "workflow_runs": runs })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(runs_path))
        .and(query_param("status", status))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "workflow_runs": [] })))
        .mount(server)
        .await;
}
