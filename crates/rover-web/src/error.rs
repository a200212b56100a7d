//! Mapping of controller errors onto HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use thiserror::Error;
use tracing::error;

use rover_core::{ConfigError, TokenizeError};
use rover_server::ControllerError;

#[derive(Debug, Error)]
#[error(transparent)]
pub struct ApiError(#[from] pub ControllerError);

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        ApiError(ControllerError::Config(err))
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            ControllerError::Config(ConfigError::Tokenize(TokenizeError::TooManyTokens(_))) => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            ControllerError::Config(err) if err.is_client_error() => StatusCode::BAD_REQUEST,
            ControllerError::Stopped => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(target: "httpd", "request failed: {}", self.0);
        }
        let body = Json(serde_json::json!({ "error": self.0.to_string() }));
        (status, body).into_response()
    }
}
