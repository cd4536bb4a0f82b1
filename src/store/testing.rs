//! Store wrapper that injects failures into an in-memory store.

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use uuid::Uuid;

use super::{CreateUserOutcome, MemoryStore, NewUser, Store, TokenRecord, User, UserPage};

#[derive(Default)]
pub(crate) struct FlakyStore {
    inner: MemoryStore,
    failing_sweeps: AtomicUsize,
    failing_deletes: AtomicBool,
    revoke_after_find: AtomicBool,
}

impl FlakyStore {
    pub(crate) fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    /// The next `count` sweeps return an error.
    pub(crate) fn fail_sweeps(&self, count: usize) {
        self.failing_sweeps.store(count, Ordering::SeqCst);
    }

    pub(crate) fn fail_user_deletes(&self) {
        self.failing_deletes.store(true, Ordering::SeqCst);
    }

    /// Delete a token right after it was looked up, as a concurrent
    /// logout would.
    pub(crate) fn revoke_after_find(&self) {
        self.revoke_after_find.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Store for FlakyStore {
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        self.inner.find_user_by_id(id).await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.inner.find_user_by_email(email).await
    }

    async fn create_user(&self, user: NewUser) -> Result<CreateUserOutcome> {
        self.inner.create_user(user).await
    }

    async fn delete_user(&self, id: Uuid) -> Result<()> {
        if self.failing_deletes.load(Ordering::SeqCst) {
            bail!("database unavailable");
        }
        self.inner.delete_user(id).await
    }

    async fn update_username(&self, id: Uuid, username: &str) -> Result<Option<User>> {
        self.inner.update_username(id, username).await
    }

    async fn list_active_users(
        &self,
        exclude: Option<Uuid>,
        page: u32,
        size: u32,
    ) -> Result<UserPage> {
        self.inner.list_active_users(exclude, page, size).await
    }

    async fn activate_user(&self, activation_token: &[u8]) -> Result<bool> {
        self.inner.activate_user(activation_token).await
    }

    async fn set_password_reset_token(&self, user_id: Uuid, reset_token: &[u8]) -> Result<()> {
        self.inner.set_password_reset_token(user_id, reset_token).await
    }

    async fn find_user_by_reset_token(&self, reset_token: &[u8]) -> Result<Option<User>> {
        self.inner.find_user_by_reset_token(reset_token).await
    }

    async fn complete_password_reset(
        &self,
        reset_token: &[u8],
        password_hash: &str,
    ) -> Result<Option<Uuid>> {
        self.inner
            .complete_password_reset(reset_token, password_hash)
            .await
    }

    async fn insert_token(&self, record: TokenRecord) -> Result<bool> {
        self.inner.insert_token(record).await
    }

    async fn find_token(&self, token_hash: &[u8]) -> Result<Option<TokenRecord>> {
        let found = self.inner.find_token(token_hash).await?;
        if self.revoke_after_find.load(Ordering::SeqCst) {
            self.inner.delete_token(token_hash).await?;
        }
        Ok(found)
    }

    async fn touch_token(&self, token_hash: &[u8], last_used_at: DateTime<Utc>) -> Result<bool> {
        self.inner.touch_token(token_hash, last_used_at).await
    }

    async fn delete_token(&self, token_hash: &[u8]) -> Result<()> {
        self.inner.delete_token(token_hash).await
    }

    async fn delete_user_tokens(&self, user_id: Uuid) -> Result<u64> {
        self.inner.delete_user_tokens(user_id).await
    }

    async fn delete_tokens_used_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let pending = self
            .failing_sweeps
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if pending.is_ok() {
            bail!("database unavailable");
        }
        self.inner.delete_tokens_used_before(cutoff).await
    }
}
