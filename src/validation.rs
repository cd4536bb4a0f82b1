//! Field rules for request bodies.
//!
//! Rules report message keys, never text; the HTTP layer translates them.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

const USERNAME_MIN: usize = 4;
const USERNAME_MAX: usize = 32;
const PASSWORD_MIN: usize = 6;

/// Field name to message key, at most one key per field.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationErrors(BTreeMap<&'static str, &'static str>);

impl ValidationErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the first failing rule for a field; later ones are ignored.
    pub fn add(&mut self, field: &'static str, key: &'static str) {
        self.0.entry(field).or_insert(key);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&'static str> {
        self.0.get(field).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
        self.0.iter().map(|(field, key)| (*field, *key))
    }

    /// # Errors
    /// Returns `self` when any field failed.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.trim().is_empty())
}

#[must_use]
pub fn username_rule(username: Option<&str>) -> Option<&'static str> {
    let Some(username) = present(username) else {
        return Some("username_null");
    };
    let len = username.chars().count();
    if !(USERNAME_MIN..=USERNAME_MAX).contains(&len) {
        return Some("username_size");
    }
    None
}

#[must_use]
pub fn email_rule(email: Option<&str>) -> Option<&'static str> {
    static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();
    let Some(email) = present(email) else {
        return Some("email_null");
    };
    let valid = EMAIL
        .get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").ok())
        .as_ref()
        .is_some_and(|regex| regex.is_match(email));
    if valid {
        None
    } else {
        Some("email_invalid")
    }
}

#[must_use]
pub fn password_rule(password: Option<&str>) -> Option<&'static str> {
    let Some(password) = password.filter(|password| !password.is_empty()) else {
        return Some("password_null");
    };
    if password.chars().count() < PASSWORD_MIN {
        return Some("password_size");
    }
    let lower = password.chars().any(char::is_lowercase);
    let upper = password.chars().any(char::is_uppercase);
    let digit = password.chars().any(|c| c.is_ascii_digit());
    if lower && upper && digit {
        None
    } else {
        Some("password_pattern")
    }
}

fn check(errors: &mut ValidationErrors, field: &'static str, rule: Option<&'static str>) {
    if let Some(key) = rule {
        errors.add(field, key);
    }
}

/// Registration body. Email uniqueness is checked later against the store.
///
/// # Errors
/// Every failing field, keyed by its JSON name.
pub fn validate_registration(
    username: Option<&str>,
    email: Option<&str>,
    password: Option<&str>,
) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    check(&mut errors, "username", username_rule(username));
    check(&mut errors, "email", email_rule(email));
    check(&mut errors, "password", password_rule(password));
    errors.into_result()
}

/// # Errors
/// `email` when missing or malformed.
pub fn validate_email(email: Option<&str>) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    check(&mut errors, "email", email_rule(email));
    errors.into_result()
}

/// # Errors
/// `password` when it breaks a password rule.
pub fn validate_password(password: Option<&str>) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    check(&mut errors, "password", password_rule(password));
    errors.into_result()
}

/// # Errors
/// `username` when missing or out of bounds.
pub fn validate_username(username: Option<&str>) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    check(&mut errors, "username", username_rule(username));
    errors.into_result()
}
