//! Login, logout and bearer resolution.

use axum::http::HeaderMap;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use super::errors::AuthError;
use super::password::CredentialVerifier;
use super::tokens::TokenManager;
use super::utils::extract_bearer_token;
use crate::store::{Store, User};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct LoginOutcome {
    pub id: Uuid,
    pub username: String,
    pub token: String,
}

#[derive(Clone)]
pub struct Authenticator {
    store: Arc<dyn Store>,
    verifier: CredentialVerifier,
    tokens: TokenManager,
}

impl Authenticator {
    #[must_use]
    pub fn new(store: Arc<dyn Store>, verifier: CredentialVerifier, tokens: TokenManager) -> Self {
        Self {
            store,
            verifier,
            tokens,
        }
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    /// Check credentials and mint a bearer token.
    ///
    /// # Errors
    /// `AuthenticationFailure`, `ForbiddenInactive` or `Store`. No token is
    /// created on failure.
    #[instrument(skip(self, password))]
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<LoginOutcome, AuthError> {
        let user = self.store.find_user_by_email(email).await?;
        self.verifier.verify(user.as_ref(), password)?;
        let Some(user) = user else {
            return Err(AuthError::AuthenticationFailure);
        };

        let token = self.tokens.issue(user.id).await?;
        info!(user_id = %user.id, "user authenticated");
        Ok(LoginOutcome {
            id: user.id,
            username: user.username,
            token,
        })
    }

    /// Revoke the presented token, if any. Never fails for a missing or
    /// unknown token.
    ///
    /// # Errors
    /// `Store` only.
    #[instrument(skip_all)]
    pub async fn logout(&self, token: Option<&str>) -> Result<(), AuthError> {
        match token {
            Some(token) => self.tokens.revoke(token).await,
            None => {
                debug!("logout without token");
                Ok(())
            }
        }
    }

    /// Resolve the bearer token of a request that requires one.
    ///
    /// # Errors
    /// `InvalidToken` when the header is missing, otherwise whatever
    /// validation reports.
    pub async fn require_bearer(&self, headers: &HeaderMap) -> Result<User, AuthError> {
        let token = extract_bearer_token(headers).ok_or(AuthError::InvalidToken)?;
        self.tokens.validate(&token).await
    }

    /// Resolve the bearer token of a request where anonymous access is fine.
    /// Invalid and expired tokens count as anonymous.
    ///
    /// # Errors
    /// `Store` only.
    pub async fn optional_bearer(&self, headers: &HeaderMap) -> Result<Option<User>, AuthError> {
        match self.require_bearer(headers).await {
            Ok(user) => Ok(Some(user)),
            Err(err) if err.is_token_failure() => Ok(None),
            Err(err) => Err(err),
        }
    }
}
