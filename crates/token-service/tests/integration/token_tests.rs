//! Integration tests for `POST /api/token`.

use chat_test_utils::{config_from, TestTokenServer, TEST_API_KEY, TEST_API_SECRET, TEST_WS_URL};
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use reqwest::{header, StatusCode};
use serde_json::{json, Value};

async fn post_token(server: &TestTokenServer, body: &str) -> Result<reqwest::Response, anyhow::Error> {
    Ok(reqwest::Client::new()
        .post(server.token_url())
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .send()
        .await?)
}

fn decode_claims(token: &str) -> Value {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_required_spec_claims(&["exp", "nbf", "iss", "sub"]);
    decode::<Value>(
        token,
        &DecodingKey::from_secret(TEST_API_SECRET.as_bytes()),
        &validation,
    )
    .expect("issued token must verify with the API secret")
    .claims
}

// ============================================================================
// Success
// ============================================================================

#[tokio::test]
async fn test_issue_token_for_alice() -> Result<(), anyhow::Error> {
    let server = TestTokenServer::spawn_configured().await?;

    let response = post_token(&server, r#"{"username":"alice"}"#).await?;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await?;
    assert_eq!(body["wsUrl"], TEST_WS_URL);
    assert_eq!(body["roomName"], "ai-chat-room");

    let token = body["token"].as_str().expect("token must be a string");
    let header = decode_header(token)?;
    assert_eq!(header.alg, Algorithm::HS256);
    assert_eq!(header.typ.as_deref(), Some("JWT"));

    let claims = decode_claims(token);
    assert_eq!(claims["iss"], TEST_API_KEY);
    assert_eq!(claims["sub"], "alice");
    assert_eq!(
        claims["exp"].as_i64().unwrap() - claims["nbf"].as_i64().unwrap(),
        21_600
    );
    assert_eq!(
        claims["video"],
        json!({
            "room": "ai-chat-room",
            "roomJoin": true,
            "canPublish": true,
            "canSubscribe": true,
            "canPublishData": true
        })
    );
    Ok(())
}

#[tokio::test]
async fn test_username_is_trimmed() -> Result<(), anyhow::Error> {
    let server = TestTokenServer::spawn_configured().await?;

    let response = post_token(&server, r#"{"username":"  alice  "}"#).await?;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await?;
    let claims = decode_claims(body["token"].as_str().unwrap());
    assert_eq!(claims["sub"], "alice");
    Ok(())
}

// ============================================================================
// Validation
// ============================================================================

#[tokio::test]
async fn test_missing_username_is_400() -> Result<(), anyhow::Error> {
    let server = TestTokenServer::spawn_configured().await?;

    for body in [
        "{}",
        r#"{"username":""}"#,
        r#"{"username":"   "}"#,
        r#"{"username":null}"#,
        r#"{"username":42}"#,
        "not json",
        "",
    ] {
        let response = post_token(&server, body).await?;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {body:?}");

        let json: Value = response.json().await?;
        assert_eq!(json, json!({ "error": "Username is required" }), "body: {body:?}");
    }
    Ok(())
}

#[tokio::test]
async fn test_missing_username_never_reaches_configuration() -> Result<(), anyhow::Error> {
    // Nothing configured: a bad request must still be a 400, not a 500
    let server = TestTokenServer::spawn(config_from(&[])).await?;

    let response = post_token(&server, r#"{"username":" "}"#).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn test_wrong_method_is_405() -> Result<(), anyhow::Error> {
    let server = TestTokenServer::spawn_configured().await?;
    let client = reqwest::Client::new();

    for method in [reqwest::Method::GET, reqwest::Method::PUT, reqwest::Method::DELETE] {
        let response = client
            .request(method.clone(), server.token_url())
            .send()
            .await?;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED, "{method}");
        assert_eq!(
            response.headers().get(header::ALLOW).map(|v| v.to_str().unwrap()),
            Some("POST")
        );

        let json: Value = response.json().await?;
        assert_eq!(json, json!({ "error": "Method not allowed" }));
    }
    Ok(())
}

// ============================================================================
// Configuration
// ============================================================================

#[tokio::test]
async fn test_missing_configuration_reports_each_value() -> Result<(), anyhow::Error> {
    let cases: [(&[(&str, &str)], Value); 4] = [
        (
            &[],
            json!({ "apiKey": "Missing", "apiSecret": "Missing", "wsUrl": "Missing" }),
        ),
        (
            &[("LIVEKIT_API_KEY", TEST_API_KEY)],
            json!({ "apiKey": "Present", "apiSecret": "Missing", "wsUrl": "Missing" }),
        ),
        (
            &[("LIVEKIT_API_KEY", TEST_API_KEY), ("LIVEKIT_API_SECRET", TEST_API_SECRET)],
            json!({ "apiKey": "Present", "apiSecret": "Present", "wsUrl": "Missing" }),
        ),
        (
            &[("LIVEKIT_API_SECRET", TEST_API_SECRET), ("LIVEKIT_URL", TEST_WS_URL)],
            json!({ "apiKey": "Missing", "apiSecret": "Present", "wsUrl": "Present" }),
        ),
    ];

    for (vars, expected) in cases {
        let server = TestTokenServer::spawn(config_from(vars)).await?;

        let response = post_token(&server, r#"{"username":"alice"}"#).await?;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body: Value = response.json().await?;
        assert_eq!(body["error"], "Missing LiveKit configuration");
        assert_eq!(body["details"], expected);
        assert!(body.get("token").is_none());
    }
    Ok(())
}
