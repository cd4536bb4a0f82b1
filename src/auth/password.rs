//! Password hashing and credential verification (Argon2id, PHC strings).

use anyhow::{anyhow, Result};
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::rngs::OsRng;
use tracing::warn;

use super::errors::AuthError;
use crate::store::User;

/// Hashes new passwords and checks supplied ones against stored hashes.
#[derive(Clone)]
pub struct CredentialVerifier {
    argon2: Argon2<'static>,
    // Verified when the account does not exist, so a missing user costs the
    // same as a wrong password.
    dummy_hash: String,
}

impl CredentialVerifier {
    /// # Errors
    /// Fails on invalid Argon2 parameters.
    pub fn new(memory_cost: u32, time_cost: u32, parallelism: u32) -> Result<Self> {
        let params = Params::new(memory_cost, time_cost, parallelism, None)
            .map_err(|err| anyhow!("invalid argon2 parameters: {err}"))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
        let mut verifier = Self {
            argon2,
            dummy_hash: String::new(),
        };
        verifier.dummy_hash = verifier.hash("dummy-Passw0rd")?;
        Ok(verifier)
    }

    /// OWASP minimum for Argon2id: 19 MiB, two passes, one lane.
    ///
    /// # Errors
    /// Fails only if hashing the dummy password fails.
    pub fn recommended() -> Result<Self> {
        Self::new(19 * 1024, 2, 1)
    }

    /// Cheap parameters for tests and local runs.
    ///
    /// # Errors
    /// Fails only if hashing the dummy password fails.
    pub fn fast() -> Result<Self> {
        Self::new(1024, 1, 1)
    }

    /// # Errors
    /// Fails when the hasher rejects the input.
    pub fn hash(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|err| anyhow!("password hashing failed: {err}"))
    }

    fn matches(&self, password: &str, hash: &str) -> bool {
        match PasswordHash::new(hash) {
            // verify_password compares in constant time
            Ok(parsed) => self
                .argon2
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(err) => {
                warn!("stored password hash is not a PHC string: {err}");
                false
            }
        }
    }

    /// Check `password` for `user`.
    ///
    /// A missing user and a wrong password fail the same way. The active flag
    /// is only consulted once the password matched.
    ///
    /// # Errors
    /// `AuthenticationFailure` or `ForbiddenInactive`.
    pub fn verify(&self, user: Option<&User>, password: &str) -> Result<(), AuthError> {
        let Some(user) = user else {
            let _ = self.matches(password, &self.dummy_hash);
            return Err(AuthError::AuthenticationFailure);
        };
        if !self.matches(password, &user.password_hash) {
            return Err(AuthError::AuthenticationFailure);
        }
        if !user.active {
            return Err(AuthError::ForbiddenInactive);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn user(verifier: &CredentialVerifier, active: bool) -> Result<User> {
        Ok(User {
            id: Uuid::new_v4(),
            username: "user1".to_string(),
            email: "user1@mail.com".to_string(),
            password_hash: verifier.hash("P4ssword")?,
            active,
            activation_token: (!active).then(|| vec![1, 2, 3]),
            password_reset_token: None,
        })
    }

    #[test]
    fn hash_is_salted_phc() -> Result<()> {
        let verifier = CredentialVerifier::fast()?;
        let first = verifier.hash("P4ssword")?;
        let second = verifier.hash("P4ssword")?;
        assert!(first.starts_with("$argon2id$"));
        assert_ne!(first, second);
        Ok(())
    }

    #[test]
    fn correct_password_for_active_user() -> Result<()> {
        let verifier = CredentialVerifier::fast()?;
        let user = user(&verifier, true)?;
        assert!(verifier.verify(Some(&user), "P4ssword").is_ok());
        Ok(())
    }

    #[test]
    fn wrong_password_and_missing_user_look_the_same() -> Result<()> {
        let verifier = CredentialVerifier::fast()?;
        let user = user(&verifier, true)?;
        assert!(matches!(
            verifier.verify(Some(&user), "Wrong-p4ss"),
            Err(AuthError::AuthenticationFailure)
        ));
        assert!(matches!(
            verifier.verify(None, "P4ssword"),
            Err(AuthError::AuthenticationFailure)
        ));
        Ok(())
    }

    #[test]
    fn inactive_checked_after_password() -> Result<()> {
        let verifier = CredentialVerifier::fast()?;
        let user = user(&verifier, false)?;
        assert!(matches!(
            verifier.verify(Some(&user), "P4ssword"),
            Err(AuthError::ForbiddenInactive)
        ));
        assert!(matches!(
            verifier.verify(Some(&user), "Wrong-p4ss"),
            Err(AuthError::AuthenticationFailure)
        ));
        Ok(())
    }

    #[test]
    fn malformed_stored_hash_fails_closed() -> Result<()> {
        let verifier = CredentialVerifier::fast()?;
        let mut user = user(&verifier, true)?;
        user.password_hash = "not-a-hash".to_string();
        assert!(matches!(
            verifier.verify(Some(&user), "P4ssword"),
            Err(AuthError::AuthenticationFailure)
        ));
        Ok(())
    }
}
