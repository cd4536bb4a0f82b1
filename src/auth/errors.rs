//! Error kinds raised by the auth core.
//!
//! The core never produces user-facing text. Each variant maps to an HTTP
//! status and a message key; the API boundary resolves the key through
//! [`crate::i18n`].

use axum::http::StatusCode;
use thiserror::Error;

use crate::validation::ValidationErrors;

/// Operation a caller tried to perform on an account it does not own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    Update,
    Delete,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("incorrect credentials")]
    AuthenticationFailure,
    #[error("account is not active")]
    ForbiddenInactive,
    #[error("invalid password reset token")]
    ForbiddenResetToken,
    #[error("operation not permitted on this account: {0:?}")]
    ForbiddenOwnership(Ownership),
    #[error("invalid token")]
    InvalidToken,
    #[error("token expired")]
    TokenExpired,
    #[error("email not in use")]
    EmailNotFound,
    #[error("user not found")]
    UserNotFound,
    #[error("invalid activation token")]
    ActivationFailure,
    #[error("email delivery failed: {0}")]
    EmailDeliveryFailure(#[source] anyhow::Error),
    #[error("validation failed")]
    Validation(ValidationErrors),
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl AuthError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::AuthenticationFailure => StatusCode::UNAUTHORIZED,
            Self::ForbiddenInactive
            | Self::ForbiddenResetToken
            | Self::ForbiddenOwnership(_)
            | Self::InvalidToken
            | Self::TokenExpired => StatusCode::FORBIDDEN,
            Self::EmailNotFound | Self::UserNotFound => StatusCode::NOT_FOUND,
            Self::ActivationFailure | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::EmailDeliveryFailure(_) => StatusCode::BAD_GATEWAY,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    #[must_use]
    pub const fn message_key(&self) -> &'static str {
        match self {
            Self::AuthenticationFailure => "authentication_failure",
            Self::ForbiddenInactive => "inactive_authentication_failure",
            Self::ForbiddenResetToken => "unauthorized_password_reset",
            Self::ForbiddenOwnership(Ownership::Update) => "unauthorized_user_update",
            Self::ForbiddenOwnership(Ownership::Delete) => "unauthorized_user_delete",
            Self::InvalidToken => "invalid_token",
            Self::TokenExpired => "token_expired",
            Self::EmailNotFound => "email_not_inuse",
            Self::UserNotFound => "user_not_found",
            Self::ActivationFailure => "account_activation_failure",
            Self::EmailDeliveryFailure(_) => "email_failure",
            Self::Validation(_) => "validation_failure",
            Self::Store(_) => "internal_error",
        }
    }

    /// Token failures are what an authenticated endpoint sees as "not you".
    #[must_use]
    pub const fn is_token_failure(&self) -> bool {
        matches!(self, Self::InvalidToken | Self::TokenExpired)
    }
}
