//! Session error types.

use thiserror::Error;

/// Errors that can occur during session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Session not found or expired.
    #[error("Session not found: {0}")]
    NotFound(String),

    /// The session backend could not be reached.
    #[error("Session store unavailable: {0}")]
    Unavailable(String),

    /// Stored session data could not be decoded.
    #[error("Session serialization error: {0}")]
    Serialization(String),

    /// Internal error.
    #[error("Internal session error: {0}")]
    Internal(String),
}

impl SessionError {
    /// Checks if this is a not found error.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Checks if the backend was unreachable.
    #[must_use]
    pub const fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

impl From<SessionError> for lb_core::Error {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotFound(_) => Self::SessionNotFound,
            SessionError::Unavailable(msg) => Self::StoreUnavailable(msg),
            SessionError::Serialization(_) | SessionError::Internal(_) => {
                Self::Internal(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        assert!(SessionError::NotFound("abc".into()).is_not_found());
        assert!(SessionError::Unavailable("down".into()).is_unavailable());
        assert!(!SessionError::Internal("x".into()).is_unavailable());
    }

    #[test]
    fn maps_onto_core_taxonomy() {
        let err: lb_core::Error = SessionError::Unavailable("down".into()).into();
        assert!(err.is_unavailable());

        let err: lb_core::Error = SessionError::NotFound("abc".into()).into();
        assert!(matches!(err, lb_core::Error::SessionNotFound));
    }
}
