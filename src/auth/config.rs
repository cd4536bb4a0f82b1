//! Auth configuration shared by the token manager, scheduler and mail links.

use chrono::Duration as ChronoDuration;
use std::time::Duration;

const DEFAULT_TOKEN_TTL_SECONDS: u64 = 7 * 24 * 60 * 60;
const DEFAULT_CLEANUP_INTERVAL_SECONDS: u64 = 60 * 60;
const DEFAULT_FRONTEND_BASE_URL: &str = "http://localhost:8080";

/// Ten years. Longer windows would overflow timestamp arithmetic.
pub const MAX_TOKEN_TTL_SECONDS: u64 = 10 * 365 * 24 * 60 * 60;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    frontend_base_url: String,
    token_ttl_seconds: u64,
    cleanup_interval_seconds: u64,
}

impl AuthConfig {
    #[must_use]
    pub fn new(frontend_base_url: String) -> Self {
        Self {
            frontend_base_url,
            token_ttl_seconds: DEFAULT_TOKEN_TTL_SECONDS,
            cleanup_interval_seconds: DEFAULT_CLEANUP_INTERVAL_SECONDS,
        }
    }

    #[must_use]
    pub fn with_token_ttl_seconds(mut self, seconds: u64) -> Self {
        self.token_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_cleanup_interval_seconds(mut self, seconds: u64) -> Self {
        self.cleanup_interval_seconds = seconds;
        self
    }

    #[must_use]
    pub fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }

    #[must_use]
    pub fn token_ttl_seconds(&self) -> u64 {
        self.token_ttl_seconds
    }

    /// Token expiry window as a chrono duration, capped at
    /// [`MAX_TOKEN_TTL_SECONDS`].
    #[must_use]
    pub fn token_ttl(&self) -> ChronoDuration {
        let seconds = self.token_ttl_seconds.min(MAX_TOKEN_TTL_SECONDS);
        ChronoDuration::try_seconds(i64::try_from(seconds).unwrap_or_default())
            .unwrap_or_else(|| ChronoDuration::days(7))
    }

    /// Sweep interval; zero is bumped to one second so the scheduler never spins.
    #[must_use]
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_seconds.max(1))
    }

    pub(crate) fn activation_url(&self, token: &str) -> String {
        let base = self.frontend_base_url.trim_end_matches('/');
        format!("{base}/#/login?token={token}")
    }

    pub(crate) fn password_reset_url(&self, token: &str) -> String {
        let base = self.frontend_base_url.trim_end_matches('/');
        format!("{base}/#/password-reset?reset={token}")
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::new(DEFAULT_FRONTEND_BASE_URL.to_string())
    }
}
