//! JSON error responses

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use saccharum_vision::SaccharumError;
use serde::Serialize;

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
}

/// Error returned by a handler, rendered as `{success: false, error}`
#[derive(Debug, Clone)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        tracing::warn!("Bad request: {}", msg);
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    pub fn payload_too_large(max_bytes: usize) -> Self {
        tracing::warn!("Upload rejected: larger than {} bytes", max_bytes);
        let limit = if max_bytes >= 1024 * 1024 {
            format!("{}MB", max_bytes / (1024 * 1024))
        } else {
            format!("{} bytes", max_bytes)
        };
        Self::new(
            StatusCode::PAYLOAD_TOO_LARGE,
            format!("The file is too large. Maximum {}", limit),
        )
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        tracing::error!("Internal error: {}", msg);
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    #[cfg(test)]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    #[cfg(test)]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<SaccharumError> for ApiError {
    fn from(err: SaccharumError) -> Self {
        match err {
            SaccharumError::ModelUnavailable(msg) => {
                tracing::error!("Model unavailable: {}", msg);
                Self::new(StatusCode::SERVICE_UNAVAILABLE, msg)
            }
            SaccharumError::InvalidInput(_) | SaccharumError::Decode(_) => {
                Self::bad_request(err.to_string())
            }
            other => Self::internal(format!("Error processing the image: {}", other)),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        tracing::warn!("Multipart error: {}", err.body_text());
        Self::new(err.status(), err.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                success: false,
                error: self.message,
            }),
        )
            .into_response()
    }
}
