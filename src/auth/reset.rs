//! Password reset.
//!
//! A user is either without a pending reset or holds exactly one reset token
//! (stored as a digest). Requesting a reset overwrites any previous token;
//! completing it clears the token, replaces the password, activates a pending
//! account and revokes every bearer token, all in one store transaction.

use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::config::AuthConfig;
use super::errors::AuthError;
use super::password::CredentialVerifier;
use super::utils::{generate_token, hash_token};
use crate::mail::{self, Mailer};
use crate::store::{Store, User};
use crate::validation;

#[derive(Clone)]
pub struct PasswordReset {
    store: Arc<dyn Store>,
    verifier: CredentialVerifier,
    mailer: Arc<dyn Mailer>,
    config: AuthConfig,
}

impl PasswordReset {
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        verifier: CredentialVerifier,
        mailer: Arc<dyn Mailer>,
        config: AuthConfig,
    ) -> Self {
        Self {
            store,
            verifier,
            mailer,
            config,
        }
    }

    /// Store a fresh reset token for `email` and mail the link.
    ///
    /// The token stays stored when delivery fails; a later request replaces it.
    ///
    /// # Errors
    /// `EmailNotFound`, `EmailDeliveryFailure` or `Store`.
    #[instrument(skip(self))]
    pub async fn request_reset(&self, email: &str) -> Result<(), AuthError> {
        let Some(user) = self.store.find_user_by_email(email).await? else {
            return Err(AuthError::EmailNotFound);
        };

        let token = generate_token()?;
        self.store
            .set_password_reset_token(user.id, &hash_token(&token))
            .await?;

        let message = mail::password_reset(&user.email, &self.config.password_reset_url(&token));
        if let Err(err) = self.mailer.send(&message).await {
            warn!(user_id = %user.id, "password reset email failed: {err:#}");
            return Err(AuthError::EmailDeliveryFailure(err));
        }
        info!(user_id = %user.id, "password reset requested");
        Ok(())
    }

    /// # Errors
    /// `ForbiddenResetToken` when no user holds the token.
    #[instrument(skip_all)]
    pub async fn validate_reset_token(&self, token: &str) -> Result<User, AuthError> {
        self.store
            .find_user_by_reset_token(&hash_token(token))
            .await?
            .ok_or(AuthError::ForbiddenResetToken)
    }

    /// Replace the password of the user holding `token`.
    ///
    /// The token is checked before the password rules, so a caller without a
    /// valid token never learns anything about password policy.
    ///
    /// # Errors
    /// `ForbiddenResetToken`, `Validation` or `Store`.
    #[instrument(skip_all)]
    pub async fn complete_reset(
        &self,
        token: &str,
        new_password: Option<&str>,
    ) -> Result<(), AuthError> {
        self.validate_reset_token(token).await?;
        validation::validate_password(new_password).map_err(AuthError::Validation)?;
        let password_hash = self.verifier.hash(new_password.unwrap_or_default())?;

        // The store re-matches the token inside its transaction.
        let Some(user_id) = self
            .store
            .complete_password_reset(&hash_token(token), &password_hash)
            .await?
        else {
            return Err(AuthError::ForbiddenResetToken);
        };
        info!(%user_id, "password reset completed");
        Ok(())
    }
}
