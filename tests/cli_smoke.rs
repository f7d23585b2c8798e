use std::process::{Command, Output};

use serde_json::json;
use tempfile::tempdir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PARK_RUN: &str = r#"{"mission_name":"Park Run","flavor_text":"Go!","challenge":{"type":"COND_AREA","target_value":150},"reward":{"type":"REW_SCORE_MULT","target_value":1.5}}"#;

fn cli() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_ares-missions"));
    cmd.env_remove("HF_API_KEY")
        .env_remove("API_KEY")
        .env_remove("RUST_LOG")
        .env_remove("MISSION_MAX_RETRIES");
    cmd
}

fn run(cmd: &mut Command) -> Output {
    cmd.output().expect("failed to spawn ares-missions")
}

async fn mock_completion(content: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "content": content }, "finish_reason": "stop" }]
        })))
        .mount(&server)
        .await;
    server
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_credential_exits_non_zero_without_network() {
    let server = mock_completion(PARK_RUN).await;

    let output = run(cli().env("HF_BASE_URL", server.uri()));

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("HF_API_KEY"), "stderr: {stderr}");
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn blank_credential_is_treated_as_missing() {
    let server = mock_completion(PARK_RUN).await;

    let output = run(cli().env("HF_API_KEY", "  ").env("HF_BASE_URL", server.uri()));

    assert!(!output.status.success());
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn success_prints_indented_mission_json() {
    let server = mock_completion(&format!("```json\n{PARK_RUN}\n```")).await;

    let output = run(cli()
        .env("HF_API_KEY", "hf_test")
        .env("HF_BASE_URL", server.uri())
        .arg("--sample-context"));

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("\n  \"mission_name\": \"Park Run\""), "stdout: {stdout}");
    let value: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(value, serde_json::from_str::<serde_json::Value>(PARK_RUN).unwrap());
}

#[tokio::test(flavor = "multi_thread")]
async fn unparseable_reply_prints_null() {
    let server = mock_completion("I'd love to help, but here's a poem instead.").await;

    let output = run(cli()
        .env("HF_API_KEY", "hf_test")
        .env("HF_BASE_URL", server.uri()));

    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "null");
    assert!(!output.stderr.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn context_file_and_count_produce_array() {
    let server = mock_completion(PARK_RUN).await;
    let dir = tempdir().unwrap();
    let ctx_path = dir.path().join("player.json");
    std::fs::write(
        &ctx_path,
        json!({
            "player_id": "walker_07",
            "level": 2,
            "play_style": "Explorer",
            "recent_history": "lost_a_zone",
            "current_conditions": { "time": "07:30", "weather": "Rain", "location_type": "Downtown" }
        })
        .to_string(),
    )
    .unwrap();

    let output = run(cli()
        .env("HF_API_KEY", "hf_test")
        .env("HF_BASE_URL", server.uri())
        .arg("--context")
        .arg(&ctx_path)
        .args(["--count", "2"]));

    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value.as_array().map(Vec::len), Some(2));

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 2);
    let body: serde_json::Value = serde_json::from_slice(&received[0].body).unwrap();
    let user = body["messages"][1]["content"].as_str().unwrap();
    assert!(user.contains("walker_07"));
}

#[test]
fn unreadable_context_file_is_fatal() {
    let output = run(cli()
        .env("HF_API_KEY", "hf_test")
        .env("HF_BASE_URL", "http://127.0.0.1:9")
        .args(["--context", "/nonexistent/player.json"]));

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("cannot read"));
}

#[tokio::test(flavor = "multi_thread")]
async fn oversized_count_is_rejected_before_any_request() {
    let server = mock_completion(PARK_RUN).await;

    let output = run(cli()
        .env("HF_API_KEY", "hf_test")
        .env("HF_BASE_URL", server.uri())
        .args(["--count", "4000000000"]));

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("--count"));
    assert!(server.received_requests().await.unwrap().is_empty());
}
