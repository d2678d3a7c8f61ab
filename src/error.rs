use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::auth::roles::Role;

/// Error taxonomy for the identity core. Messages are the stable,
/// client-facing wording; store and hashing internals are logged but never
/// echoed to the client.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("An account with this email already exists")]
    AccountExists,
    /// Deliberately identical for unknown email and wrong password.
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Third-party identity verification failed")]
    ThirdPartyVerificationFailed,
    #[error("Missing authentication token")]
    Unauthenticated,
    #[error("Invalid authentication token")]
    InvalidToken,
    /// Valid signature, past expiry. Distinct message so clients can prompt
    /// a re-login instead of treating it as a hard denial.
    #[error("Session expired, please log in again")]
    SessionExpired,
    #[error("Account not found")]
    AccountNotFound,
    #[error("Access restricted to roles: {0}")]
    Forbidden(String),
    /// Wrong and expired recovery tokens are indistinguishable by design.
    #[error("Invalid or expired reset token")]
    InvalidOrExpiredToken,
    #[error("Failed to send the password reset email")]
    NotificationFailed,
    #[error("Something went wrong, please try again later")]
    Internal(#[source] anyhow::Error),
}

impl ApiError {
    pub fn forbidden(allowed: &[Role]) -> Self {
        let roles = allowed
            .iter()
            .map(Role::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        Self::Forbidden(roles)
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_)
            | Self::AccountExists
            | Self::InvalidCredentials
            | Self::InvalidOrExpiredToken => StatusCode::BAD_REQUEST,
            Self::ThirdPartyVerificationFailed
            | Self::Unauthenticated
            | Self::InvalidToken
            | Self::SessionExpired => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::AccountNotFound => StatusCode::NOT_FOUND,
            Self::NotificationFailed | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Internal(ref source) = self {
            error!(error = %source, "internal error");
        }
        let body = Json(ErrorBody {
            success: false,
            message: self.to_string(),
        });
        (self.status(), body).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        Self::Internal(e.into())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        Self::Internal(e)
    }
}
