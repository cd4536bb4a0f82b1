//! Postgres-backed store. Schema lives in `sql/schema.sql`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, PgPool, Row};
use tracing::{Instrument, Span};
use uuid::Uuid;

use super::{CreateUserOutcome, NewUser, Store, TokenRecord, User, UserPage};

const USER_COLUMNS: &str =
    "id, username, email, password_hash, active, activation_token, password_reset_token";

#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn query_span(operation: &'static str, statement: &str) -> Span {
    tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

fn user_from_row(row: &PgRow) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        active: row.get("active"),
        activation_token: row.get("activation_token"),
        password_reset_token: row.get("password_reset_token"),
    }
}

fn token_from_row(row: &PgRow) -> TokenRecord {
    TokenRecord {
        token_hash: row.get("token_hash"),
        user_id: row.get("user_id"),
        last_used_at: row.get("last_used_at"),
    }
}

#[async_trait]
impl Store for PgStore {
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", &query))
            .await
            .context("failed to lookup user by id")?;
        Ok(row.as_ref().map(user_from_row))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let row = sqlx::query(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", &query))
            .await
            .context("failed to lookup user by email")?;
        Ok(row.as_ref().map(user_from_row))
    }

    async fn create_user(&self, user: NewUser) -> Result<CreateUserOutcome> {
        let query = format!(
            "INSERT INTO users (username, email, password_hash, activation_token) \
             VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query(&query)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.activation_token)
            .fetch_one(&self.pool)
            .instrument(query_span("INSERT", &query))
            .await;

        match row {
            Ok(row) => Ok(CreateUserOutcome::Created(user_from_row(&row))),
            Err(err) if is_unique_violation(&err) => Ok(CreateUserOutcome::Conflict),
            Err(err) => Err(err).context("failed to insert user"),
        }
    }

    async fn delete_user(&self, id: Uuid) -> Result<()> {
        let query = "DELETE FROM users WHERE id = $1";
        sqlx::query(query)
            .bind(id)
            .execute(&self.pool)
            .instrument(query_span("DELETE", query))
            .await
            .context("failed to delete user")?;
        Ok(())
    }

    async fn update_username(&self, id: Uuid, username: &str) -> Result<Option<User>> {
        let query = format!("UPDATE users SET username = $2 WHERE id = $1 RETURNING {USER_COLUMNS}");
        let row = sqlx::query(&query)
            .bind(id)
            .bind(username)
            .fetch_optional(&self.pool)
            .instrument(query_span("UPDATE", &query))
            .await
            .context("failed to update username")?;
        Ok(row.as_ref().map(user_from_row))
    }

    async fn list_active_users(
        &self,
        exclude: Option<Uuid>,
        page: u32,
        size: u32,
    ) -> Result<UserPage> {
        let query = r"
            SELECT COUNT(*) AS total
            FROM users
            WHERE active AND ($1::uuid IS NULL OR id <> $1)
        ";
        let total: i64 = sqlx::query(query)
            .bind(exclude)
            .fetch_one(&self.pool)
            .instrument(query_span("SELECT", query))
            .await
            .context("failed to count active users")?
            .get("total");

        let query = format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE active AND ($1::uuid IS NULL OR id <> $1) \
             ORDER BY created_at, id LIMIT $2 OFFSET $3"
        );
        let rows = sqlx::query(&query)
            .bind(exclude)
            .bind(i64::from(size))
            .bind(i64::from(page) * i64::from(size))
            .fetch_all(&self.pool)
            .instrument(query_span("SELECT", &query))
            .await
            .context("failed to list active users")?;

        Ok(UserPage {
            users: rows.iter().map(user_from_row).collect(),
            total: u64::try_from(total).unwrap_or_default(),
        })
    }

    async fn activate_user(&self, activation_token: &[u8]) -> Result<bool> {
        let query = r"
            UPDATE users
            SET active = TRUE, activation_token = NULL
            WHERE activation_token = $1
        ";
        let result = sqlx::query(query)
            .bind(activation_token)
            .execute(&self.pool)
            .instrument(query_span("UPDATE", query))
            .await
            .context("failed to activate user")?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_password_reset_token(&self, user_id: Uuid, reset_token: &[u8]) -> Result<()> {
        let query = "UPDATE users SET password_reset_token = $2 WHERE id = $1";
        sqlx::query(query)
            .bind(user_id)
            .bind(reset_token)
            .execute(&self.pool)
            .instrument(query_span("UPDATE", query))
            .await
            .context("failed to store password reset token")?;
        Ok(())
    }

    async fn find_user_by_reset_token(&self, reset_token: &[u8]) -> Result<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE password_reset_token = $1");
        let row = sqlx::query(&query)
            .bind(reset_token)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", &query))
            .await
            .context("failed to lookup user by reset token")?;
        Ok(row.as_ref().map(user_from_row))
    }

    async fn complete_password_reset(
        &self,
        reset_token: &[u8],
        password_hash: &str,
    ) -> Result<Option<Uuid>> {
        // Password change and token revocation commit together or not at all.
        let mut tx = self
            .pool
            .begin()
            .await
            .context("begin password reset transaction")?;

        let query = r"
            UPDATE users
            SET password_hash = $2,
                password_reset_token = NULL,
                activation_token = CASE WHEN active THEN activation_token ELSE NULL END,
                active = TRUE
            WHERE password_reset_token = $1
            RETURNING id
        ";
        let row = sqlx::query(query)
            .bind(reset_token)
            .bind(password_hash)
            .fetch_optional(&mut *tx)
            .instrument(query_span("UPDATE", query))
            .await
            .context("failed to update password")?;

        let Some(row) = row else {
            let _ = tx.rollback().await;
            return Ok(None);
        };
        let user_id: Uuid = row.get("id");

        let query = "DELETE FROM tokens WHERE user_id = $1";
        sqlx::query(query)
            .bind(user_id)
            .execute(&mut *tx)
            .instrument(query_span("DELETE", query))
            .await
            .context("failed to revoke tokens after password reset")?;

        tx.commit()
            .await
            .context("commit password reset transaction")?;

        Ok(Some(user_id))
    }

    async fn insert_token(&self, record: TokenRecord) -> Result<bool> {
        let query = r"
            INSERT INTO tokens (token_hash, user_id, last_used_at)
            VALUES ($1, $2, $3)
        ";
        let result = sqlx::query(query)
            .bind(&record.token_hash)
            .bind(record.user_id)
            .bind(record.last_used_at)
            .execute(&self.pool)
            .instrument(query_span("INSERT", query))
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(err) if is_unique_violation(&err) => Ok(false),
            Err(err) => Err(err).context("failed to insert token"),
        }
    }

    async fn find_token(&self, token_hash: &[u8]) -> Result<Option<TokenRecord>> {
        let query = "SELECT token_hash, user_id, last_used_at FROM tokens WHERE token_hash = $1";
        let row = sqlx::query(query)
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", query))
            .await
            .context("failed to lookup token")?;
        Ok(row.as_ref().map(token_from_row))
    }

    async fn touch_token(&self, token_hash: &[u8], last_used_at: DateTime<Utc>) -> Result<bool> {
        let query = "UPDATE tokens SET last_used_at = $2 WHERE token_hash = $1";
        let result = sqlx::query(query)
            .bind(token_hash)
            .bind(last_used_at)
            .execute(&self.pool)
            .instrument(query_span("UPDATE", query))
            .await
            .context("failed to refresh token")?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_token(&self, token_hash: &[u8]) -> Result<()> {
        let query = "DELETE FROM tokens WHERE token_hash = $1";
        sqlx::query(query)
            .bind(token_hash)
            .execute(&self.pool)
            .instrument(query_span("DELETE", query))
            .await
            .context("failed to delete token")?;
        Ok(())
    }

    async fn delete_user_tokens(&self, user_id: Uuid) -> Result<u64> {
        let query = "DELETE FROM tokens WHERE user_id = $1";
        let result = sqlx::query(query)
            .bind(user_id)
            .execute(&self.pool)
            .instrument(query_span("DELETE", query))
            .await
            .context("failed to delete user tokens")?;
        Ok(result.rows_affected())
    }

    async fn delete_tokens_used_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let query = "DELETE FROM tokens WHERE last_used_at < $1";
        let result = sqlx::query(query)
            .bind(cutoff)
            .execute(&self.pool)
            .instrument(query_span("DELETE", query))
            .await
            .context("failed to delete expired tokens")?;
        Ok(result.rows_affected())
    }
}
