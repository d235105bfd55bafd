//! Error taxonomy for the credential and session subsystem.
//!
//! Authentication-path failures (`BadCredentials`, `InvalidToken`,
//! `StaleCredential`, `AccountNotFound`, `AccountInactive`) all surface to
//! the caller as the same opaque response; which one actually fired is
//! visible in the logs only. Role refusal and recovery-token refusals stay
//! distinct because they are not worth disguising: the caller already
//! proved who they are, or holds a token that was mailed to them.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::account::store::StoreError;

use super::recovery::RecoveryError;
use super::secret::SecretError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("validation failed: {}", .0.join(", "))]
    Validation(Vec<String>),
    #[error("incorrect email or password")]
    BadCredentials,
    #[error("invalid session token")]
    InvalidToken,
    #[error("session token predates the last credential change")]
    StaleCredential,
    #[error("account not found")]
    AccountNotFound,
    #[error("account is deactivated")]
    AccountInactive,
    #[error("insufficient role")]
    Forbidden,
    #[error("recovery token has expired")]
    RecoveryExpired,
    #[error("recovery token is invalid")]
    RecoveryMismatch,
    #[error("email is already registered")]
    DuplicateEmail,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    #[must_use]
    pub fn validation(message: &str) -> Self {
        Self::Validation(vec![message.to_string()])
    }

    /// Wrap an unexpected failure that should surface as a generic
    /// internal error.
    pub fn internal<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Internal(anyhow::Error::new(err))
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail => Self::DuplicateEmail,
            StoreError::Backend(err) => Self::Internal(err),
        }
    }
}

impl From<RecoveryError> for AuthError {
    fn from(err: RecoveryError) -> Self {
        match err {
            RecoveryError::Expired => Self::RecoveryExpired,
            RecoveryError::Mismatch => Self::RecoveryMismatch,
        }
    }
}

impl From<SecretError> for AuthError {
    fn from(err: SecretError) -> Self {
        match err {
            SecretError::EmptyPlaintext => {
                Self::Validation(vec!["Please provide a password".to_string()])
            }
            other => Self::internal(other),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::Validation(issues) => (StatusCode::BAD_REQUEST, issues.join(". ")),
            Self::BadCredentials
            | Self::InvalidToken
            | Self::StaleCredential
            | Self::AccountNotFound
            | Self::AccountInactive => {
                warn!("authentication rejected: {self}");
                (StatusCode::UNAUTHORIZED, "Not authenticated".to_string())
            }
            Self::Forbidden => (
                StatusCode::FORBIDDEN,
                "You do not have permission to perform this action".to_string(),
            ),
            Self::RecoveryExpired => (
                StatusCode::BAD_REQUEST,
                "Recovery token has expired".to_string(),
            ),
            Self::RecoveryMismatch => (
                StatusCode::BAD_REQUEST,
                "Recovery token is invalid".to_string(),
            ),
            Self::DuplicateEmail => (
                StatusCode::CONFLICT,
                "Email is already registered".to_string(),
            ),
            Self::Internal(err) => {
                error!("internal error: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(json!({ "message": message }))).into_response()
    }
}
