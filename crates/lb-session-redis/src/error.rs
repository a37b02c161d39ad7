//! Redis session error conversion.

use lb_session::SessionError;

/// Converts a `fred` Redis error to a `SessionError`.
#[allow(clippy::needless_pass_by_value)]
pub fn from_redis_error(err: fred::error::Error) -> SessionError {
    match err.kind() {
        fred::error::ErrorKind::IO
        | fred::error::ErrorKind::Timeout
        | fred::error::ErrorKind::Canceled
        | fred::error::ErrorKind::Backpressure => SessionError::Unavailable(err.to_string()),
        _ => SessionError::Internal(err.to_string()),
    }
}

/// Converts a serialization error to a `SessionError`.
#[allow(clippy::needless_pass_by_value)]
pub fn from_serde_error(err: serde_json::Error) -> SessionError {
    SessionError::Serialization(err.to_string())
}
