//! Structured error bodies.
//!
//! # Responsibilities
//! - Serialize `{"code", "cause", "debug"}` error bodies
//! - Never fail the caller: one degraded fallback, then a fatal exit
//! - Provide the default 404 / 405 / 403 responders
//!
//! # Design Decisions
//! - `debug` is only filled in for encoding failures
//! - The fallback is an explicit second attempt, not recursion

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Cause used by the degraded fallback body.
pub const DEGRADED_CAUSE: &str = "something went wrong, try again in few minutes";

/// Debug note attached to the degraded fallback body.
pub const DEGRADED_DEBUG: &str = "err: JSON encoding failed";

/// Default error body for HTTP responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorResponse {
    /// HTTP status code.
    pub code: u16,

    /// User-friendly error message.
    pub cause: String,

    /// Additional information, omitted from the body when empty.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub debug: String,

    /// Set on the fallback body produced after an encoding failure.
    #[serde(skip)]
    degraded: bool,
}

/// Raised when even the degraded fallback cannot be serialized.
#[derive(Debug, Error)]
#[error("error response looping detected: {0}")]
pub struct EncodeError(#[source] pub serde_json::Error);

impl ErrorResponse {
    /// Create an error body with the given status and cause.
    pub fn new(status: StatusCode, cause: impl Into<String>) -> Self {
        Self {
            code: status.as_u16(),
            cause: cause.into(),
            debug: String::new(),
            degraded: false,
        }
    }

    /// Attach debug detail.
    pub fn with_debug(mut self, debug: impl Into<String>) -> Self {
        self.debug = debug.into();
        self
    }

    /// The fixed body used when normal encoding fails.
    pub fn degraded() -> Self {
        Self {
            code: StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
            cause: DEGRADED_CAUSE.to_string(),
            debug: DEGRADED_DEBUG.to_string(),
            degraded: true,
        }
    }

    /// 404 for unmatched paths.
    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "resource not found")
    }

    /// 405 for matched paths with an unmatched method.
    pub fn method_not_allowed() -> Self {
        Self::new(StatusCode::METHOD_NOT_ALLOWED, "method not allowed")
    }

    /// 403 for routes flagged as deprecated.
    pub fn deprecated() -> Self {
        Self::new(StatusCode::FORBIDDEN, "method deprecated")
    }

    /// Whether this is the degraded fallback body.
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// Status code as an `http` type, 500 when `code` is out of range.
    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Encode for transmit.
    ///
    /// Falls back to the degraded body once. If that cannot be encoded
    /// either the process exits, since no body can be produced at all.
    pub fn to_json(&self) -> String {
        match self.try_encode_with(|response| serde_json::to_string(response)) {
            Ok(body) => body,
            Err(e) => {
                tracing::error!(error = %e, "Degraded error response could not be encoded");
                std::process::exit(1);
            }
        }
    }

    /// Encode using `serialize`, trying the degraded fallback at most once.
    pub fn try_encode_with<F>(&self, serialize: F) -> Result<String, EncodeError>
    where
        F: Fn(&ErrorResponse) -> serde_json::Result<String>,
    {
        let err = match serialize(self) {
            Ok(body) => return Ok(body),
            Err(e) => e,
        };

        if self.degraded {
            return Err(EncodeError(err));
        }

        tracing::warn!(
            code = self.code,
            cause = %self.cause,
            error = %err,
            "Error response encoding failed, using fallback"
        );

        let fallback = Self::degraded();
        serialize(&fallback).map_err(EncodeError)
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        (
            self.status(),
            [(header::CONTENT_TYPE, "application/json")],
            self.to_json(),
        )
            .into_response()
    }
}

/// Fallback for paths no route matches.
pub async fn not_found() -> ErrorResponse {
    ErrorResponse::not_found()
}

/// Fallback for known paths requested with an unsupported method.
pub async fn method_not_allowed() -> ErrorResponse {
    ErrorResponse::method_not_allowed()
}

/// Responder installed in place of a deprecated route's handler.
pub async fn deprecated() -> ErrorResponse {
    ErrorResponse::deprecated()
}
