//! Error responses.
//!
//! Auth failures always map to `403` with the error id only. The cause
//! stays in the log next to the same id.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::auth::ErrorId;
use crate::echo::ServiceError;

#[derive(Debug)]
pub enum ApiError {
    PermissionDenied(ErrorId),
    InvalidArgument(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            ApiError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::PermissionDenied { error_id } => ApiError::PermissionDenied(error_id),
            ServiceError::InvalidArgument(message) => ApiError::InvalidArgument(message),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::PermissionDenied(error_id) => format!("Authorization failed: {error_id}"),
            ApiError::InvalidArgument(message) => message,
        };
        (status, body).into_response()
    }
}
