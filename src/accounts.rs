//! Account management: registration, activation, listing, profile changes.

use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::auth::{
    generate_token, hash_token, AuthConfig, AuthError, CredentialVerifier, Ownership,
};
use crate::mail::{self, Mailer};
use crate::store::{CreateUserOutcome, NewUser, Store, User, UserPage};
use crate::validation::{self, ValidationErrors};

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Parse raw `page`/`size` query values. Anything unparsable or out of range
/// falls back to page 0 and size 10.
#[must_use]
pub fn page_params(page: Option<&str>, size: Option<&str>) -> (u32, u32) {
    let page = page
        .and_then(|value| value.trim().parse::<u32>().ok())
        .unwrap_or(0);
    let size = size
        .and_then(|value| value.trim().parse::<u32>().ok())
        .filter(|size| (1..=MAX_PAGE_SIZE).contains(size))
        .unwrap_or(DEFAULT_PAGE_SIZE);
    (page, size)
}

#[derive(Clone)]
pub struct Accounts {
    store: Arc<dyn Store>,
    verifier: CredentialVerifier,
    mailer: Arc<dyn Mailer>,
    config: AuthConfig,
}

impl Accounts {
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

    /// Create an inactive account and mail its activation link.
    ///
    /// When the mail cannot be sent the account is removed again.
    ///
    /// # Errors
    /// `Validation`, `EmailDeliveryFailure` or `Store`.
    #[instrument(skip(self, password))]
    pub async fn register(
        &self,
        username: Option<&str>,
        email: Option<&str>,
        password: Option<&str>,
    ) -> Result<(), AuthError> {
        let mut errors = validation::validate_registration(username, email, password)
            .err()
            .unwrap_or_default();
        if let (Some(email), None) = (email, errors.get("email")) {
            if self.store.find_user_by_email(email).await?.is_some() {
                errors.add("email", "email_inuse");
            }
        }
        errors.into_result().map_err(AuthError::Validation)?;

        let (username, email, password) = (
            username.unwrap_or_default(),
            email.unwrap_or_default(),
            password.unwrap_or_default(),
        );
        let activation_token = generate_token()?;
        let outcome = self
            .store
            .create_user(NewUser {
                username: username.to_string(),
                email: email.to_string(),
                password_hash: self.verifier.hash(password)?,
                activation_token: hash_token(&activation_token),
            })
            .await?;
        let user = match outcome {
            CreateUserOutcome::Created(user) => user,
            CreateUserOutcome::Conflict => {
                let mut errors = ValidationErrors::new();
                errors.add("email", "email_inuse");
                return Err(AuthError::Validation(errors));
            }
        };

        let message = mail::account_activation(
            &user.email,
            &self.config.activation_url(&activation_token),
        );
        if let Err(err) = self.mailer.send(&message).await {
            warn!(user_id = %user.id, "activation email failed, removing account: {err:#}");
            if let Err(delete_err) = self.store.delete_user(user.id).await {
                error!(user_id = %user.id, "failed to remove unactivatable account: {delete_err:#}");
            }
            return Err(AuthError::EmailDeliveryFailure(err));
        }
        info!(user_id = %user.id, "user registered");
        Ok(())
    }

    /// # Errors
    /// `ActivationFailure` when no pending account holds the token.
    #[instrument(skip_all)]
    pub async fn activate(&self, token: &str) -> Result<(), AuthError> {
        if self.store.activate_user(&hash_token(token)).await? {
            info!("account activated");
            Ok(())
        } else {
            Err(AuthError::ActivationFailure)
        }
    }

    /// Active users, oldest first, never including the caller.
    ///
    /// # Errors
    /// `Store` only.
    pub async fn list(&self, caller: Option<&User>, page: u32, size: u32) -> Result<UserPage, AuthError> {
        Ok(self
            .store
            .list_active_users(caller.map(|user| user.id), page, size)
            .await?)
    }

    /// # Errors
    /// `UserNotFound` for unknown or inactive accounts.
    pub async fn get(&self, id: Uuid) -> Result<User, AuthError> {
        self.store
            .find_user_by_id(id)
            .await?
            .filter(|user| user.active)
            .ok_or(AuthError::UserNotFound)
    }

    /// # Errors
    /// `ForbiddenOwnership` unless `caller` is the target, then `Validation`.
    #[instrument(skip(self, caller), fields(caller = %caller.id))]
    pub async fn update_username(
        &self,
        caller: &User,
        id: Uuid,
        username: Option<&str>,
    ) -> Result<User, AuthError> {
        if caller.id != id {
            return Err(AuthError::ForbiddenOwnership(Ownership::Update));
        }
        validation::validate_username(username).map_err(AuthError::Validation)?;
        self.store
            .update_username(id, username.unwrap_or_default())
            .await?
            .ok_or(AuthError::ForbiddenOwnership(Ownership::Update))
    }

    /// Delete the caller's own account; its tokens go with it.
    ///
    /// # Errors
    /// `ForbiddenOwnership` unless `caller` is the target.
    #[instrument(skip(self, caller), fields(caller = %caller.id))]
    pub async fn delete(&self, caller: &User, id: Uuid) -> Result<(), AuthError> {
        if caller.id != id {
            return Err(AuthError::ForbiddenOwnership(Ownership::Delete));
        }
        self.store.delete_user(id).await?;
        info!(user_id = %id, "account deleted");
        Ok(())
    }
}
