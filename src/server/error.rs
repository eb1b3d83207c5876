use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::error::Error;

/// JSON error for API endpoints: `{"error": "<public message>"}`.
///
/// The wrapped [`Error`] is logged, never sent to the client.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    source: Error,
}

impl ApiError {
    /// Replace the public message, keeping status and logged cause.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<Error> for ApiError {
    fn from(source: Error) -> Self {
        let (status, message) = match &source {
            Error::ConfigurationMissing(what) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("{what} is not configured on the server."),
            ),
            Error::UpstreamUnreachable { .. }
            | Error::UpstreamRejected { .. }
            | Error::UpstreamDecode { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to communicate with an upstream service.".to_string(),
            ),
            Error::Unauthenticated => (StatusCode::UNAUTHORIZED, source.to_string()),
            Error::NoRepositorySelected => (StatusCode::BAD_REQUEST, source.to_string()),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".to_string()),
        };
        Self {
            status,
            message,
            source,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self.source {
            Error::UpstreamRejected {
                operation,
                status,
                detail,
            } => {
                tracing::error!(operation, status, detail = %detail, "Upstream rejected request");
            }
            source if self.status.is_server_error() => {
                tracing::error!(error = %source, "Request failed");
            }
            source => {
                tracing::debug!(error = %source, status = %self.status, "Request rejected");
            }
        }
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}
