//! Authentication core.
//!
//! Credentials are checked by [`CredentialVerifier`], bearer tokens live in
//! the store as SHA-256 digests and expire after a period of disuse (sliding
//! window, enforced lazily by [`TokenManager::validate`] and eagerly by the
//! [`CleanupScheduler`]). Password reset is a separate state machine in
//! [`PasswordReset`].

mod cleanup;
mod clock;
mod config;
mod errors;
mod password;
mod reset;
mod service;
mod tokens;
mod utils;

pub use cleanup::{CleanupHandle, CleanupScheduler};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AuthConfig, MAX_TOKEN_TTL_SECONDS};
pub use errors::{AuthError, Ownership};
pub use password::CredentialVerifier;
pub use reset::PasswordReset;
pub use service::{Authenticator, LoginOutcome};
pub use tokens::TokenManager;
pub use utils::{extract_bearer_token, generate_token, hash_token};
