//! # Accounts
//!
//! `accounts` is a user-account backend: registration with email activation,
//! credential login issuing opaque bearer tokens, password reset, profile
//! update and paginated listing.
//!
//! ## Bearer tokens
//!
//! Tokens are 32 random bytes, base64url encoded, and only their SHA-256
//! digest is stored. Expiry is sliding: every authenticated request moves
//! `last_used_at` forward, a token unused for longer than the configured TTL
//! (7 days by default) is rejected and deleted on sight, and a background
//! sweep removes the ones nobody presents again.
//!
//! ## Password reset
//!
//! A reset request stores a single pending reset token per user and mails it.
//! Completing the reset swaps the password hash, clears the reset token,
//! activates a pending account and revokes every token of the user in one
//! store transaction.

pub mod accounts;
pub mod api;
pub mod auth;
pub mod cli;
pub mod i18n;
pub mod mail;
pub mod store;
pub mod validation;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
