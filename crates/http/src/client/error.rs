//! Client error types

use dashboard_core::CoreError;
use std::fmt;
use thiserror::Error;

/// Coarse classification used for reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No response reached the client
    Network,
    /// The server answered with a 5xx status
    Server,
    /// Credentials were rejected and could not be renewed
    Auth,
    /// Any other non-success status, handed back unchanged
    Http,
    /// Local failure: configuration, storage or decoding
    Client,
}

impl ErrorKind {
    /// Stable label for logs and user-facing output
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Network => "NETWORK_ERROR",
            Self::Server => "SERVER_ERROR",
            Self::Auth => "AUTH_ERROR",
            Self::Http => "HTTP_ERROR",
            Self::Client => "CLIENT_ERROR",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Client error types
///
/// Payloads are plain strings so a single refresh failure can be cloned out to
/// every request that was waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The request never got a response (connection, DNS, timeout)
    #[error("Network error: {0}")]
    Network(String),

    /// Server returned an error status
    #[error("Server error {status}: {message}")]
    ServerError { status: u16, message: String },

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// No usable session; the user has been sent back to the login page
    #[error("Session expired: {0}")]
    SessionExpired(String),

    /// Resource not found
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Bad request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Forbidden
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Any other 4xx status
    #[error("Request rejected with {status}: {message}")]
    Rejected { status: u16, message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Session storage or navigation failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

impl ClientError {
    /// Create error from HTTP status code
    pub fn from_status(status: reqwest::StatusCode, message: String) -> Self {
        match status.as_u16() {
            400 => Self::BadRequest(message),
            401 => Self::AuthenticationFailed(message),
            403 => Self::Forbidden(message),
            404 => Self::NotFound(message),
            code if code >= 500 => Self::ServerError {
                status: code,
                message,
            },
            code => Self::Rejected {
                status: code,
                message,
            },
        }
    }

    /// Classification of this error
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Network(_) => ErrorKind::Network,
            Self::ServerError { .. } => ErrorKind::Server,
            Self::AuthenticationFailed(_) | Self::SessionExpired(_) => ErrorKind::Auth,
            Self::NotFound(_) | Self::BadRequest(_) | Self::Forbidden(_) | Self::Rejected { .. } => {
                ErrorKind::Http
            }
            Self::Serialization(_) | Self::Storage(_) | Self::Configuration(_) => ErrorKind::Client,
        }
    }

    /// HTTP status behind the error, when there was a response
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::ServerError { status, .. } | Self::Rejected { status, .. } => Some(*status),
            Self::AuthenticationFailed(_) => Some(401),
            Self::NotFound(_) => Some(404),
            Self::BadRequest(_) => Some(400),
            Self::Forbidden(_) => Some(403),
            _ => None,
        }
    }

    /// Whether the caller has to sign in again
    pub const fn is_auth_expired(&self) -> bool {
        matches!(self.kind(), ErrorKind::Auth)
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            Self::Configuration(err.to_string())
        } else if err.is_decode() {
            Self::Serialization(err.to_string())
        } else if let Some(status) = err.status() {
            Self::from_status(status, err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<CoreError> for ClientError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Serialization { message } => Self::Serialization(message),
            other => Self::Storage(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn statuses_map_to_variants() {
        let err = |code| ClientError::from_status(StatusCode::from_u16(code).unwrap(), "m".into());

        assert_eq!(err(400), ClientError::BadRequest("m".into()));
        assert_eq!(err(401), ClientError::AuthenticationFailed("m".into()));
        assert_eq!(err(404), ClientError::NotFound("m".into()));
        assert_eq!(
            err(422),
            ClientError::Rejected {
                status: 422,
                message: "m".into()
            }
        );
        assert_eq!(
            err(503),
            ClientError::ServerError {
                status: 503,
                message: "m".into()
            }
        );
    }

    #[test]
    fn kinds_have_stable_labels() {
        assert_eq!(ClientError::Network("x".into()).kind().as_str(), "NETWORK_ERROR");
        assert_eq!(
            ClientError::ServerError {
                status: 500,
                message: String::new()
            }
            .kind()
            .to_string(),
            "SERVER_ERROR"
        );
        assert!(ClientError::SessionExpired("x".into()).is_auth_expired());
        assert_eq!(ClientError::Forbidden("x".into()).kind(), ErrorKind::Http);
    }

    #[test]
    fn status_is_reported_for_http_errors() {
        assert_eq!(ClientError::NotFound(String::new()).status(), Some(404));
        assert_eq!(ClientError::Network(String::new()).status(), None);
    }
}
