//! Token Issuer error types.
//!
//! Response bodies use the flat shape clients already consume:
//! `{ "error": <message>, "details": <optional> }`.

use crate::config::ConfigurationReport;
use axum::{
    http::{header::ALLOW, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Token Issuer error type.
///
/// Maps to HTTP status codes:
/// - MethodNotAllowed: 405
/// - MissingUsername: 400
/// - MissingConfiguration, TokenGeneration: 500
#[derive(Debug, Error)]
pub enum TokenServiceError {
    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Username is required")]
    MissingUsername,

    #[error("Missing LiveKit configuration")]
    MissingConfiguration(ConfigurationReport),

    #[error("Failed to generate token: {0}")]
    TokenGeneration(String),
}

impl TokenServiceError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            TokenServiceError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            TokenServiceError::MissingUsername => StatusCode::BAD_REQUEST,
            TokenServiceError::MissingConfiguration(_) | TokenServiceError::TokenGeneration(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<ErrorDetails>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum ErrorDetails {
    Configuration(ConfigurationReport),
    Message(String),
}

impl IntoResponse for TokenServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = match self {
            TokenServiceError::MethodNotAllowed => ErrorResponse {
                error: "Method not allowed",
                details: None,
            },
            TokenServiceError::MissingUsername => ErrorResponse {
                error: "Username is required",
                details: None,
            },
            TokenServiceError::MissingConfiguration(report) => ErrorResponse {
                error: "Missing LiveKit configuration",
                details: Some(ErrorDetails::Configuration(report)),
            },
            TokenServiceError::TokenGeneration(message) => ErrorResponse {
                error: "Failed to generate token",
                details: Some(ErrorDetails::Message(message)),
            },
        };

        let mut response = (status, Json(body)).into_response();
        if status == StatusCode::METHOD_NOT_ALLOWED {
            response
                .headers_mut()
                .insert(ALLOW, HeaderValue::from_static("POST"));
        }
        response
    }
}
