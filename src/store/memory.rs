//! In-process store used for tests and local development.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{CreateUserOutcome, NewUser, Store, TokenRecord, User, UserPage};

#[derive(Default)]
struct Inner {
    // Insertion order doubles as creation order for listing.
    users: Vec<User>,
    tokens: HashMap<Vec<u8>, TokenRecord>,
}

impl Inner {
    fn user_mut(&mut self, id: Uuid) -> Option<&mut User> {
        self.users.iter_mut().find(|user| user.id == id)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn token_count(&self) -> usize {
        self.inner.lock().await.tokens.len()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let inner = self.inner.lock().await;
        Ok(inner.users.iter().find(|user| user.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let inner = self.inner.lock().await;
        Ok(inner.users.iter().find(|user| user.email == email).cloned())
    }

    async fn create_user(&self, user: NewUser) -> Result<CreateUserOutcome> {
        let mut inner = self.inner.lock().await;
        if inner.users.iter().any(|existing| existing.email == user.email) {
            return Ok(CreateUserOutcome::Conflict);
        }
        let created = User {
            id: Uuid::new_v4(),
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            active: false,
            activation_token: Some(user.activation_token),
            password_reset_token: None,
        };
        inner.users.push(created.clone());
        Ok(CreateUserOutcome::Created(created))
    }

    async fn delete_user(&self, id: Uuid) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.users.retain(|user| user.id != id);
        inner.tokens.retain(|_, token| token.user_id != Some(id));
        Ok(())
    }

    async fn update_username(&self, id: Uuid, username: &str) -> Result<Option<User>> {
        let mut inner = self.inner.lock().await;
        Ok(inner.user_mut(id).map(|user| {
            user.username = username.to_string();
            user.clone()
        }))
    }

    async fn list_active_users(
        &self,
        exclude: Option<Uuid>,
        page: u32,
        size: u32,
    ) -> Result<UserPage> {
        let inner = self.inner.lock().await;
        let visible: Vec<&User> = inner
            .users
            .iter()
            .filter(|user| user.active && Some(user.id) != exclude)
            .collect();
        let offset = usize::try_from(u64::from(page) * u64::from(size)).unwrap_or(usize::MAX);
        let users = visible
            .iter()
            .skip(offset)
            .take(size as usize)
            .map(|user| (*user).clone())
            .collect();
        Ok(UserPage {
            users,
            total: visible.len() as u64,
        })
    }

    async fn activate_user(&self, activation_token: &[u8]) -> Result<bool> {
        let mut inner = self.inner.lock().await;
        let Some(user) = inner
            .users
            .iter_mut()
            .find(|user| user.activation_token.as_deref() == Some(activation_token))
        else {
            return Ok(false);
        };
        user.active = true;
        user.activation_token = None;
        Ok(true)
    }

    async fn set_password_reset_token(&self, user_id: Uuid, reset_token: &[u8]) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if let Some(user) = inner.user_mut(user_id) {
            user.password_reset_token = Some(reset_token.to_vec());
        }
        Ok(())
    }

    async fn find_user_by_reset_token(&self, reset_token: &[u8]) -> Result<Option<User>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .users
            .iter()
            .find(|user| user.password_reset_token.as_deref() == Some(reset_token))
            .cloned())
    }

    async fn complete_password_reset(
        &self,
        reset_token: &[u8],
        password_hash: &str,
    ) -> Result<Option<Uuid>> {
        // One lock scope is the transaction boundary here.
        let mut inner = self.inner.lock().await;
        let Some(user) = inner
            .users
            .iter_mut()
            .find(|user| user.password_reset_token.as_deref() == Some(reset_token))
        else {
            return Ok(None);
        };
        user.password_hash = password_hash.to_string();
        user.password_reset_token = None;
        if !user.active {
            user.active = true;
            user.activation_token = None;
        }
        let user_id = user.id;
        inner.tokens.retain(|_, token| token.user_id != Some(user_id));
        Ok(Some(user_id))
    }

    async fn insert_token(&self, record: TokenRecord) -> Result<bool> {
        let mut inner = self.inner.lock().await;
        if inner.tokens.contains_key(&record.token_hash) {
            return Ok(false);
        }
        inner.tokens.insert(record.token_hash.clone(), record);
        Ok(true)
    }

    async fn find_token(&self, token_hash: &[u8]) -> Result<Option<TokenRecord>> {
        let inner = self.inner.lock().await;
        Ok(inner.tokens.get(token_hash).cloned())
    }

    async fn touch_token(&self, token_hash: &[u8], last_used_at: DateTime<Utc>) -> Result<bool> {
        let mut inner = self.inner.lock().await;
        Ok(inner
            .tokens
            .get_mut(token_hash)
            .map(|token| token.last_used_at = last_used_at)
            .is_some())
    }

    async fn delete_token(&self, token_hash: &[u8]) -> Result<()> {
        self.inner.lock().await.tokens.remove(token_hash);
        Ok(())
    }

    async fn delete_user_tokens(&self, user_id: Uuid) -> Result<u64> {
        let mut inner = self.inner.lock().await;
        let before = inner.tokens.len();
        inner.tokens.retain(|_, token| token.user_id != Some(user_id));
        Ok((before - inner.tokens.len()) as u64)
    }

    async fn delete_tokens_used_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let mut inner = self.inner.lock().await;
        let before = inner.tokens.len();
        inner.tokens.retain(|_, token| token.last_used_at >= cutoff);
        Ok((before - inner.tokens.len()) as u64)
    }
}
