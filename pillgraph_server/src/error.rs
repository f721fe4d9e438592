//! Structured error types for the Pillgraph REST API.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Structured API error response body.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiError {
    pub code: String,
    pub message: String,
    /// For NOT_FOUND: the entity kind that was queried.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// For NOT_FOUND: the name that was queried.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Application-level error that converts into an HTTP response.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
    pub kind: Option<String>,
    pub name: Option<String>,
}

impl AppError {
    /// Not-found for a specific entity; carries the kind and queried name so
    /// the caller can render a helpful message.
    pub fn entity_not_found(kind: pillgraph_core::EntityKind, name: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            code: "NOT_FOUND".into(),
            message: format!("No {} named '{}'", kind, name),
            kind: Some(kind.to_string()),
            name: Some(name.to_string()),
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "BAD_REQUEST".into(),
            message: msg.into(),
            kind: None,
            name: None,
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "INTERNAL_ERROR".into(),
            message: msg.into(),
            kind: None,
            name: None,
        }
    }

    /// The scanned image does not show a recognizable medication.
    pub fn not_a_medication() -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "NOT_A_MEDICATION".into(),
            message: "The scanned item does not appear to be a medication. \
                      Please try again with a medication label."
                .into(),
            kind: None,
            name: None,
        }
    }

    /// No vision provider is configured (missing API key).
    pub fn vision_unavailable() -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            code: "VISION_UNAVAILABLE".into(),
            message: "No vision provider is configured. Set the provider API key \
                      environment variable named by vision.api_key_env."
                .into(),
            kind: None,
            name: None,
        }
    }

    /// The vision provider call failed.
    pub fn vision_failed(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_GATEWAY,
            code: "VISION_FAILED".into(),
            message: msg.into(),
            kind: None,
            name: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = axum::Json(ApiError {
            code: self.code,
            message: self.message,
            kind: self.kind,
            name: self.name,
        });
        (self.status, body).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::internal(err.to_string())
    }
}
