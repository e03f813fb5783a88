//! Error types for the RouterOS API client

use std::collections::HashMap;
use std::time::Duration;

use thiserror::Error;

/// All failures the client can surface.
///
/// `Trap` is the only application-level kind: the connection that produced
/// it stays usable. Every other kind poisons the worker it occurred on.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Application error signalled by the router with `!trap`
    #[error("RouterOS trap: {message}")]
    Trap {
        message: String,
        details: HashMap<String, String>,
    },

    /// Unrecoverable error signalled by the router with `!fatal`
    #[error("RouterOS fatal: {message}")]
    Fatal { message: String },

    /// The router rejected the credentialed `/login`
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// DNS, TCP dial, TLS handshake, or pre-auth transport failure
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// A configured deadline elapsed
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// The connection was closed locally or dropped between requests
    #[error("connection closed")]
    Closed,

    /// Malformed wire data: illegal length prefix, truncated sentence,
    /// missing block terminator, malformed salt
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl ApiError {
    /// Stable kind tag, used as the `reason` metadata in telemetry events.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Trap { .. } => "trap",
            Self::Fatal { .. } => "fatal",
            Self::AuthFailed(_) => "auth_failed",
            Self::ConnectionFailed(_) => "connection_failed",
            Self::Timeout(_) => "timeout",
            Self::Closed => "closed",
            Self::Protocol(_) => "protocol",
        }
    }

    /// Whether a worker that produced this error must be discarded.
    ///
    /// Only `Trap` leaves the connection in a usable state.
    #[must_use]
    pub fn closes_connection(&self) -> bool {
        !matches!(self, Self::Trap { .. })
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;
        match err.kind() {
            ErrorKind::UnexpectedEof => Self::Protocol("unexpected end of stream".to_string()),
            ErrorKind::ConnectionReset | ErrorKind::BrokenPipe | ErrorKind::NotConnected => {
                Self::Closed
            }
            _ => Self::ConnectionFailed(err.to_string()),
        }
    }
}

/// Convenient alias for Result with the client error
pub type Result<T> = std::result::Result<T, ApiError>;
