//! Server error types.

use aerodeck_core::CoreError;
use hyper::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] hyper::Error),

    #[error("{0}")]
    Core(#[from] CoreError),

    #[error("invalid JSON body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("no route for {0}")]
    NotFound(String),

    #[error("method {method} not allowed for {path}")]
    MethodNotAllowed { method: String, path: String },

    #[error("request body exceeds {0} bytes")]
    BodyTooLarge(usize),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    /// Returns the error code reported in response bodies.
    pub fn error_code(&self) -> &'static str {
        match self {
            ServerError::Core(e) => e.error_code(),
            ServerError::Json(_) | ServerError::InvalidRequest(_) => "BAD_REQUEST",
            ServerError::NotFound(_) => "NOT_FOUND",
            ServerError::MethodNotAllowed { .. } => "METHOD_NOT_ALLOWED",
            ServerError::BodyTooLarge(_) => "PAYLOAD_TOO_LARGE",
            ServerError::Io(_) | ServerError::Http(_) | ServerError::Internal(_) => {
                "INTERNAL_ERROR"
            }
        }
    }

    /// Returns the HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self.error_code() {
            "NOT_CONNECTED" => StatusCode::SERVICE_UNAVAILABLE,
            "BAD_REQUEST" => StatusCode::BAD_REQUEST,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "METHOD_NOT_ALLOWED" => StatusCode::METHOD_NOT_ALLOWED,
            "PAYLOAD_TOO_LARGE" => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns whether the caller is at fault.
    pub fn is_client_error(&self) -> bool {
        self.status().is_client_error()
    }
}

/// JSON body of an error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: String,
}

impl From<&ServerError> for ErrorBody {
    fn from(e: &ServerError) -> Self {
        Self {
            error: e.to_string(),
            code: e.error_code().to_string(),
        }
    }
}
