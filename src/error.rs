use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Startup failures while reading the environment.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} not found")]
    Missing(&'static str),

    #[error("{key} is invalid: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Failures on the server side of the handshake: starting the flow and
/// exchanging a relayed code for tokens.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no pending sign-in found in session")]
    MissingSession,

    #[error("state parameter does not match the pending sign-in")]
    StateMismatch,

    #[error("session store failure: {0}")]
    Session(String),

    #[error("token request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("token endpoint answered HTTP {status}: {body}")]
    Provider { status: u16, body: String },

    #[error("token response could not be read: {0}")]
    InvalidResponse(String),
}

impl From<tower_sessions::session::Error> for AuthError {
    fn from(err: tower_sessions::session::Error) -> Self {
        AuthError::Session(err.to_string())
    }
}

impl AuthError {
    /// Stable machine-readable code used in JSON error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MissingSession => "missing_session",
            AuthError::StateMismatch => "state_mismatch",
            AuthError::Session(_) => "session_error",
            AuthError::Request(_) => "token_request_failed",
            AuthError::Provider { .. } => "token_exchange_rejected",
            AuthError::InvalidResponse(_) => "invalid_token_response",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::MissingSession | AuthError::StateMismatch => StatusCode::BAD_REQUEST,
            AuthError::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::Request(_) | AuthError::Provider { .. } | AuthError::InvalidResponse(_) => {
                StatusCode::BAD_GATEWAY
            }
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
    pub message: String,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.code(),
            message: self.to_string(),
        });

        (self.status(), body).into_response()
    }
}
