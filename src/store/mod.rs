//! Persistence seam for users and bearer tokens.
//!
//! All token-like values (bearer, activation, password reset) are passed in
//! already hashed; the store never sees raw tokens.

mod memory;
mod postgres;
#[cfg(test)]
pub(crate) mod testing;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub active: bool,
    pub activation_token: Option<Vec<u8>>,
    pub password_reset_token: Option<Vec<u8>>,
}

#[derive(Clone, Debug)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub activation_token: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenRecord {
    pub token_hash: Vec<u8>,
    pub user_id: Option<Uuid>,
    pub last_used_at: DateTime<Utc>,
}

#[derive(Debug)]
pub enum CreateUserOutcome {
    Created(User),
    Conflict,
}

#[derive(Debug, Default)]
pub struct UserPage {
    pub users: Vec<User>,
    pub total: u64,
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Insert a pending (inactive) user; `Conflict` when the email is taken.
    async fn create_user(&self, user: NewUser) -> Result<CreateUserOutcome>;

    /// Delete a user and, through the foreign key, all of its tokens.
    async fn delete_user(&self, id: Uuid) -> Result<()>;

    async fn update_username(&self, id: Uuid, username: &str) -> Result<Option<User>>;

    /// Active users ordered by creation, skipping `exclude`.
    async fn list_active_users(
        &self,
        exclude: Option<Uuid>,
        page: u32,
        size: u32,
    ) -> Result<UserPage>;

    /// Flip the account holding this activation token to active.
    async fn activate_user(&self, activation_token: &[u8]) -> Result<bool>;

    async fn set_password_reset_token(&self, user_id: Uuid, reset_token: &[u8]) -> Result<()>;

    async fn find_user_by_reset_token(&self, reset_token: &[u8]) -> Result<Option<User>>;

    /// Atomically: match the reset token, store the new password hash, clear
    /// the reset token, activate a pending account, and delete every token of
    /// the user. Returns the user id, or `None` when no user holds the token.
    async fn complete_password_reset(
        &self,
        reset_token: &[u8],
        password_hash: &str,
    ) -> Result<Option<Uuid>>;

    /// Returns `false` when the digest already exists.
    async fn insert_token(&self, record: TokenRecord) -> Result<bool>;

    async fn find_token(&self, token_hash: &[u8]) -> Result<Option<TokenRecord>>;

    /// Move `last_used_at` forward; `false` when the token is gone.
    async fn touch_token(&self, token_hash: &[u8], last_used_at: DateTime<Utc>) -> Result<bool>;

    async fn delete_token(&self, token_hash: &[u8]) -> Result<()>;

    async fn delete_user_tokens(&self, user_id: Uuid) -> Result<u64>;

    /// Delete tokens whose `last_used_at` is strictly before `cutoff`.
    async fn delete_tokens_used_before(&self, cutoff: DateTime<Utc>) -> Result<u64>;
}
