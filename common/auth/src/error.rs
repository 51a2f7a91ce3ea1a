use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("at least one token source (header or query) must be enabled")]
    NoTokenSource,
    #[error("invalid bypass route '{0}', expected 'METHOD /path'")]
    InvalidBypassRoute(String),
    #[error("failed to sign session token: {0}")]
    Signing(String),
    #[error("session token missing")]
    MissingToken,
    #[error("session token invalid")]
    InvalidToken,
    #[error("session token expired or not yet valid")]
    ExpiredToken,
    #[error("session token subject malformed")]
    InvalidSubject,
    #[error("principal could not be resolved")]
    PrincipalUnavailable,
    #[error("request is not authenticated")]
    Unauthenticated,
    #[error("missing permission '{required}'")]
    Forbidden { required: String },
}

impl AuthError {
    /// True for every failure that must surface as a bare 401.
    pub fn is_authentication(&self) -> bool {
        matches!(
            self,
            AuthError::MissingToken
                | AuthError::InvalidToken
                | AuthError::ExpiredToken
                | AuthError::InvalidSubject
                | AuthError::PrincipalUnavailable
                | AuthError::Unauthenticated
        )
    }

    pub fn status(&self) -> StatusCode {
        if self.is_authentication() {
            return StatusCode::UNAUTHORIZED;
        }
        match self {
            AuthError::Forbidden { .. } => StatusCode::FORBIDDEN,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        // The cause of a 401 is never disclosed to the client.
        let body = match &self {
            err if err.is_authentication() => ErrorBody {
                code: "UNAUTHORIZED",
                message: "unauthorized".to_string(),
            },
            AuthError::Forbidden { .. } => ErrorBody {
                code: "FORBIDDEN",
                message: self.to_string(),
            },
            _ => ErrorBody {
                code: "AUTH_INTERNAL",
                message: "internal error".to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authentication_failures_share_one_status() {
        for err in [
            AuthError::MissingToken,
            AuthError::InvalidToken,
            AuthError::ExpiredToken,
            AuthError::InvalidSubject,
            AuthError::PrincipalUnavailable,
            AuthError::Unauthenticated,
        ] {
            assert_eq!(err.into_response().status(), StatusCode::UNAUTHORIZED);
        }
    }

    #[test]
    fn forbidden_and_internal_statuses() {
        let forbidden = AuthError::Forbidden {
            required: "admin.roles.create".into(),
        };
        assert_eq!(forbidden.into_response().status(), StatusCode::FORBIDDEN);
        assert_eq!(
            AuthError::Signing("boom".into()).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AuthError::NoTokenSource.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
