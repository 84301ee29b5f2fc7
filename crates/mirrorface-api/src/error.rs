//! API error types
//!
//! Only the two error kinds the gateway surfaces directly to a client as a
//! generic failure live here: InvalidPath, UnsupportedMethod.
//! `FileNotInManifest` gets its own 404 body inline in the handler, since it
//! carries no extra context worth a variant. Everything else in the error
//! taxonomy (corrupt/inconsistent manifests, upstream errors) is handled by
//! logging and falling through to the upstream fetch rather than surfacing
//! as a 5xx.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("invalid path")]
    InvalidPath,

    #[error("method not allowed")]
    UnsupportedMethod,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::InvalidPath => StatusCode::BAD_REQUEST,
            ApiError::UnsupportedMethod => StatusCode::METHOD_NOT_ALLOWED,
        };

        (status, self.to_string()).into_response()
    }
}
