//! Bearer token lifecycle: issue, validate with sliding expiry, revoke, sweep.

use anyhow::anyhow;
use chrono::Duration;
use std::sync::Arc;
use tracing::{debug, instrument};
use uuid::Uuid;

use super::clock::Clock;
use super::errors::AuthError;
use super::utils::{generate_token, hash_token};
use crate::store::{Store, TokenRecord, User};

const ISSUE_ATTEMPTS: usize = 3;

#[derive(Clone)]
pub struct TokenManager {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl TokenManager {
    #[must_use]
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self { store, clock, ttl }
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Mint a token for `user_id` and persist its digest with
    /// `last_used_at = now`. Returns the raw token.
    ///
    /// # Errors
    /// `Store` when the RNG or the store fails, or when every attempt collided.
    #[instrument(skip(self))]
    pub async fn issue(&self, user_id: Uuid) -> Result<String, AuthError> {
        for _ in 0..ISSUE_ATTEMPTS {
            let token = generate_token()?;
            let record = TokenRecord {
                token_hash: hash_token(&token),
                user_id: Some(user_id),
                last_used_at: self.clock.now(),
            };
            if self.store.insert_token(record).await? {
                return Ok(token);
            }
            debug!("token digest collision, retrying");
        }
        Err(AuthError::Store(anyhow!("failed to generate unique token")))
    }

    /// Resolve a token to its owner and slide its expiry forward.
    ///
    /// An expired token is deleted before `TokenExpired` is returned.
    ///
    /// # Errors
    /// `InvalidToken`, `TokenExpired` or `Store`.
    #[instrument(skip_all)]
    pub async fn validate(&self, token: &str) -> Result<User, AuthError> {
        let token_hash = hash_token(token);
        let Some(record) = self.store.find_token(&token_hash).await? else {
            return Err(AuthError::InvalidToken);
        };

        let now = self.clock.now();
        if now - record.last_used_at > self.ttl {
            self.store.delete_token(&token_hash).await?;
            return Err(AuthError::TokenExpired);
        }

        let Some(user_id) = record.user_id else {
            return Err(AuthError::InvalidToken);
        };
        let Some(user) = self.store.find_user_by_id(user_id).await? else {
            return Err(AuthError::InvalidToken);
        };

        // revoked between lookup and refresh
        if !self.store.touch_token(&token_hash, now).await? {
            return Err(AuthError::InvalidToken);
        }
        Ok(user)
    }

    /// Delete one token. Unknown tokens are not an error.
    ///
    /// # Errors
    /// `Store` only.
    #[instrument(skip_all)]
    pub async fn revoke(&self, token: &str) -> Result<(), AuthError> {
        self.store.delete_token(&hash_token(token)).await?;
        Ok(())
    }

    /// # Errors
    /// `Store` only.
    #[instrument(skip(self))]
    pub async fn revoke_all(&self, user_id: Uuid) -> Result<u64, AuthError> {
        Ok(self.store.delete_user_tokens(user_id).await?)
    }

    /// Delete every token idle for longer than the ttl, whoever owns it.
    ///
    /// # Errors
    /// `Store` only.
    #[instrument(skip(self))]
    pub async fn sweep_expired(&self) -> Result<u64, AuthError> {
        let cutoff = self
            .clock
            .now()
            .checked_sub_signed(self.ttl)
            .ok_or_else(|| anyhow!("token ttl {} out of range", self.ttl))?;
        Ok(self.store.delete_tokens_used_before(cutoff).await?)
    }
}
