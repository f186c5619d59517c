use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{credentials::AuthFailure, guard::GuardError, models::ErrorBody, token::TokenError};

/// ApiError
///
/// The only error type that crosses the HTTP boundary. Every variant renders a fixed, generic
/// message so callers cannot tell token forgery failures or unknown usernames apart; the
/// underlying cause is logged by whoever produced it.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("authentication required")]
    Unauthorized,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("access denied")]
    Forbidden,
    #[error("internal error")]
    Internal,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized | ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::MalformedToken | TokenError::SignatureInvalid | TokenError::Expired => {
                ApiError::Unauthorized
            }
            // Issuance failures are server-side faults, not caller mistakes.
            TokenError::InvalidTtl | TokenError::Signing(_) => ApiError::Internal,
        }
    }
}

impl From<AuthFailure> for ApiError {
    fn from(_: AuthFailure) -> Self {
        ApiError::InvalidCredentials
    }
}

impl From<GuardError> for ApiError {
    fn from(err: GuardError) -> Self {
        match err {
            GuardError::MissingToken => ApiError::Unauthorized,
            GuardError::InsufficientRole => ApiError::Forbidden,
        }
    }
}
