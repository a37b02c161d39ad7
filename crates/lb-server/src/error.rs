//! HTTP error responses.
//!
//! Every failure is rendered as `{status, message}` JSON. Store outages
//! become 503 with a generic retry message; other server-side failures are
//! logged and collapse to 500.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use lb_auth::AuthError;
use serde::Serialize;

/// Errors returned by request handlers.
#[derive(Debug)]
pub enum ApiError {
    /// A broker error.
    Core(lb_core::Error),
    /// The request needs a logged-in session.
    Unauthorized,
    /// The request conflicts with the current account state.
    Conflict(String),
}

/// Result alias for handlers.
pub type ApiResult<T> = Result<T, ApiError>;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// HTTP status code.
    pub status: u16,
    /// Human-readable message.
    pub message: String,
}

impl ApiError {
    /// Returns the HTTP status for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        use lb_core::Error as E;
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Core(err) => match err {
                E::CredentialsRejected(_)
                | E::InvalidToken(_)
                | E::AuthenticationFailed
                | E::SessionNotFound => StatusCode::UNAUTHORIZED,
                E::MergeConflict { .. } => StatusCode::CONFLICT,
                E::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                E::NotFound(_) => StatusCode::NOT_FOUND,
                E::Forbidden(_) => StatusCode::FORBIDDEN,
                E::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
                E::Config(_) | E::Crypto(_) | E::Internal(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Unauthorized => "Not logged in.".to_string(),
            Self::Conflict(message) => message.clone(),
            Self::Core(err) => err.user_message(),
        }
    }
}

impl From<lb_core::Error> for ApiError {
    fn from(err: lb_core::Error) -> Self {
        Self::Core(err)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self::Core(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if let Self::Core(err) = &self {
            if err.is_server_error() {
                tracing::error!(error = %err, status = status.as_u16(), "request failed");
            } else {
                tracing::debug!(error = %err, status = status.as_u16(), "request rejected");
            }
        }
        let body = ErrorBody {
            status: status.as_u16(),
            message: self.message(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lb_core::Error;

    #[test]
    fn status_mapping() {
        let cases = [
            (Error::CredentialsRejected("Wrong credentials".into()), 401),
            (Error::merge_conflict(["github"]), 409),
            (Error::StoreUnavailable("down".into()), 503),
            (Error::NotFound("Account x".into()), 404),
            (Error::Validation("bad".into()), 422),
            (Error::Internal("boom".into()), 500),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status_code().as_u16(), status);
        }
        assert_eq!(ApiError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn outage_message_is_generic() {
        let err = ApiError::from(Error::StoreUnavailable("10.0.0.3:5432 refused".into()));
        assert_eq!(err.message(), lb_core::error::RETRY_LATER_MESSAGE);
    }

    #[test]
    fn unknown_provider_is_not_found() {
        let err = ApiError::from(AuthError::UnknownProvider("nope".into()));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }
}
