//! Error types for planet-api

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use planet_core::ErrorKind;

/// Error type for planet-api
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Authentication required")]
    Unauthenticated,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Core(#[from] planet_core::Error),
}

/// JSON error body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated | Self::InvalidToken => StatusCode::UNAUTHORIZED,
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Core(e) => match e.kind() {
                ErrorKind::Validation => StatusCode::BAD_REQUEST,
                ErrorKind::Unauthenticated => StatusCode::UNAUTHORIZED,
                ErrorKind::Forbidden => StatusCode::FORBIDDEN,
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::Conflict => StatusCode::CONFLICT,
                ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Core(planet_core::Error::Validation(msg))
            | Self::Core(planet_core::Error::Forbidden(msg))
            | Self::Core(planet_core::Error::NotFound(msg))
            | Self::Core(planet_core::Error::Conflict(msg))
            | Self::InvalidRequest(msg) => msg.clone(),
            Self::Core(_) if self.status() == StatusCode::INTERNAL_SERVER_ERROR => {
                "internal server error".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("Request failed: {}", self);
        }
        (status, Json(ErrorResponse { error: self.message() })).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

/// Result type alias for planet-api
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use planet_core::Error;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ApiError::from(Error::validation("bad")), StatusCode::BAD_REQUEST),
            (ApiError::from(Error::forbidden("no")), StatusCode::FORBIDDEN),
            (ApiError::from(Error::not_found("gone")), StatusCode::NOT_FOUND),
            (ApiError::from(Error::Conflict("dup".into())), StatusCode::CONFLICT),
            (ApiError::from(Error::Internal("db".into())), StatusCode::INTERNAL_SERVER_ERROR),
            (ApiError::Unauthenticated, StatusCode::UNAUTHORIZED),
            (ApiError::InvalidToken, StatusCode::UNAUTHORIZED),
            (ApiError::InvalidRequest("x".into()), StatusCode::BAD_REQUEST),
        ];
        for (err, status) in cases {
            assert_eq!(err.status(), status);
        }
    }

    #[test]
    fn test_internal_details_hidden() {
        let err = ApiError::from(Error::Internal("connection refused on 10.0.0.1".into()));
        assert_eq!(err.message(), "internal server error");

        let err = ApiError::from(Error::not_found("event 42"));
        assert_eq!(err.message(), "event 42");
    }

    #[test]
    fn test_invalid_request_message_is_bare() {
        let err = ApiError::InvalidRequest("invalid eventId".into());
        assert_eq!(err.message(), "invalid eventId");
    }
}
