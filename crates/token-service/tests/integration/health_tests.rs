//! Integration tests for health probes and the metrics endpoint.

use chat_test_utils::{config_from, TestTokenServer, TEST_WS_URL};
use reqwest::StatusCode;

#[tokio::test]
async fn test_health_endpoint_returns_ok() -> Result<(), anyhow::Error> {
    let server = TestTokenServer::spawn_configured().await?;

    let response = reqwest::get(format!("{}/health", server.url())).await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await?, "OK");
    Ok(())
}

#[tokio::test]
async fn test_ready_endpoint_returns_ok_when_configured() -> Result<(), anyhow::Error> {
    let server = TestTokenServer::spawn_configured().await?;

    let response = reqwest::get(format!("{}/ready", server.url())).await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body, serde_json::json!({ "status": "ready" }));
    Ok(())
}

#[tokio::test]
async fn test_ready_endpoint_returns_503_without_secret() -> Result<(), anyhow::Error> {
    let server =
        TestTokenServer::spawn(config_from(&[("LIVEKIT_API_KEY", "APIx"), ("LIVEKIT_URL", TEST_WS_URL)]))
            .await?;

    let response = reqwest::get(format!("{}/ready", server.url())).await?;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["status"], "not_ready");
    // Which value is missing is only logged, never returned here
    assert_eq!(body["error"], "Service configuration incomplete");
    Ok(())
}

#[tokio::test]
async fn test_metrics_endpoint_serves_text() -> Result<(), anyhow::Error> {
    let server = TestTokenServer::spawn_configured().await?;

    let response = reqwest::get(format!("{}/metrics", server.url())).await?;

    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}
