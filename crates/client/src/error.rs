//! Client error model.

use serde_json::Value;
use thiserror::Error;

use tenantdesk_auth::{CredentialsError, EditorError};
use tenantdesk_core::DomainError;

use crate::credentials::StoreError;

const GENERIC_FAILURE: &str = "Something went wrong. Please try again.";

/// Every failure the client surfaces to its callers.
///
/// Cloneable so a single refresh failure can be handed to every request that
/// was waiting on it.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// Client-side input constraints; nothing was sent.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Non-2xx response (other than a retried 401), or a 2xx body that did
    /// not have the expected shape.
    #[error("HTTP {status}: {message}")]
    Http {
        status: u16,
        message: String,
        body: Value,
    },

    /// The session could not be (re-)established.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// No response was received.
    #[error("network error: {0}")]
    Network(String),

    #[error(transparent)]
    Storage(#[from] StoreError),

    /// A local RBAC editing rule was violated.
    #[error(transparent)]
    Editor(EditorError),
}

impl ApiError {
    /// Error for a failed response, taking the message from the server's body
    /// when it carries one.
    pub fn from_response(status: u16, bytes: &[u8]) -> Self {
        let body: Value = serde_json::from_slice(bytes).unwrap_or(Value::Null);
        let message = ["message", "error"]
            .iter()
            .find_map(|field| body.get(field).and_then(Value::as_str))
            .map(str::to_string)
            .or_else(|| {
                reqwest::StatusCode::from_u16(status)
                    .ok()
                    .and_then(|s| s.canonical_reason())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| "request failed".to_string());
        Self::Http {
            status,
            message,
            body,
        }
    }

    /// A successful response whose body did not decode into the expected record.
    pub fn unexpected_shape(status: u16, reason: impl core::fmt::Display) -> Self {
        Self::Http {
            status,
            message: format!("unexpected response shape: {reason}"),
            body: Value::Null,
        }
    }

    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_builder() {
            Self::Validation(format!("invalid request: {err}"))
        } else if err.is_timeout() {
            Self::Network("request timed out".to_string())
        } else {
            Self::Network(err.to_string())
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// Text suitable for a transient notification.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Http { message, .. } => message.clone(),
            Self::Auth(_) => "Your session has expired. Please sign in again.".to_string(),
            Self::Network(_) => "Unable to reach the server. Please check your connection.".to_string(),
            Self::Storage(_) => GENERIC_FAILURE.to_string(),
            Self::Editor(err) => err.to_string(),
        }
    }
}

impl From<EditorError> for ApiError {
    fn from(err: EditorError) -> Self {
        match err {
            EditorError::Domain(DomainError::Validation(message)) => Self::Validation(message),
            other => Self::Editor(other),
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        EditorError::Domain(err).into()
    }
}

impl From<CredentialsError> for ApiError {
    fn from(err: CredentialsError) -> Self {
        Self::Validation(err.to_string())
    }
}
