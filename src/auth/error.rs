use std::fmt;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use super::{saml::SamlError, session_store::SessionError};
use crate::db::DbError;

/// JSON error body: `{"error": {"code": "...", "message": "..."}}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorInfo,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorInfo {
                code: code.into(),
                message: message.into(),
            },
        }
    }
}

/// Body of the request gate's 403.
pub const PLEASE_LOGIN: &str = "Please login";

#[derive(Debug)]
pub enum AuthError {
    /// Assertion lacks the email or subject attribute.
    BadAssertion,

    /// The SAML response failed parsing or validation.
    InvalidResponse(String),

    /// No IdP registered under this code.
    UnknownIdp(String),

    /// `/login` could not decide which IdP to use.
    NoIdpSelected,

    /// Unauthenticated caller that must not be redirected.
    Unauthorized,

    /// Relational store failure during login.
    Store(DbError),

    /// Session backend failure.
    Session(SessionError),

    Internal(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AuthError::BadAssertion => (StatusCode::UNAUTHORIZED, "bad_login", "Bad login."),
            AuthError::InvalidResponse(_) => (
                StatusCode::UNAUTHORIZED,
                "invalid_response",
                "The identity provider response could not be validated",
            ),
            AuthError::UnknownIdp(_) => (
                StatusCode::NOT_FOUND,
                "unknown_idp",
                "Unknown identity provider",
            ),
            AuthError::NoIdpSelected => (
                StatusCode::BAD_REQUEST,
                "no_idp_selected",
                "No identity provider selected",
            ),
            AuthError::Unauthorized => {
                return (
                    StatusCode::FORBIDDEN,
                    Json(serde_json::json!({ "error": PLEASE_LOGIN })),
                )
                    .into_response();
            }
            AuthError::Store(e) => {
                tracing::error!(error = %e, "Store failure during authentication");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error",
                )
            }
            AuthError::Session(e) => {
                tracing::error!(error = %e, "Session store failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error",
                )
            }
            AuthError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal authentication error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error",
                )
            }
        };

        (status, Json(ErrorResponse::new(code, message))).into_response()
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::BadAssertion => write!(f, "Bad login: assertion lacks email or subject"),
            AuthError::InvalidResponse(msg) => write!(f, "Invalid SAML response: {}", msg),
            AuthError::UnknownIdp(code) => write!(f, "Unknown identity provider: {}", code),
            AuthError::NoIdpSelected => write!(f, "No identity provider selected"),
            AuthError::Unauthorized => write!(f, "{}", PLEASE_LOGIN),
            AuthError::Store(e) => write!(f, "Store error: {}", e),
            AuthError::Session(e) => write!(f, "Session error: {}", e),
            AuthError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<DbError> for AuthError {
    fn from(e: DbError) -> Self {
        AuthError::Store(e)
    }
}

impl From<SamlError> for AuthError {
    fn from(e: SamlError) -> Self {
        match e {
            SamlError::Response(msg) => AuthError::InvalidResponse(msg),
            other => AuthError::Internal(other.to_string()),
        }
    }
}

impl From<SessionError> for AuthError {
    fn from(e: SessionError) -> Self {
        AuthError::Session(e)
    }
}

#[cfg(test)]
mod tests {
    use http_body_util::BodyExt;

    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_unauthorized_renders_please_login() {
        let response = AuthError::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({ "error": "Please login" })
        );
    }

    #[tokio::test]
    async fn test_bad_assertion_is_generic_401() {
        let response = AuthError::BadAssertion.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "bad_login");
        assert_eq!(body["error"]["message"], "Bad login.");
    }

    #[tokio::test]
    async fn test_store_failure_hides_details() {
        let response = AuthError::Store(DbError::Conflict("users_pkey".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert!(!body.to_string().contains("users_pkey"));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AuthError::UnknownIdp("x".into()).into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AuthError::NoIdpSelected.into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AuthError::InvalidResponse("sig".into()).into_response().status(),
            StatusCode::UNAUTHORIZED
        );
    }
}
