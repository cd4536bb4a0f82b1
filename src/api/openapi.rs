use utoipa::{
    openapi::{
        security::{Http, HttpAuthScheme, SecurityScheme},
        Contact, License,
    },
    Modify, OpenApi,
};

use super::error::ErrorBody;
use super::handlers::{auth, health, password, users, MessageBody};
use crate::auth::LoginOutcome;

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        auth::login,
        auth::logout,
        password::request_reset,
        password::complete_reset,
        users::register,
        users::activate,
        users::list,
        users::get_user,
        users::update_user,
        users::delete_user,
    ),
    components(schemas(
        ErrorBody,
        MessageBody,
        LoginOutcome,
        health::Health,
        auth::Credentials,
        password::PasswordResetRequest,
        password::PasswordUpdate,
        users::Registration,
        users::UserUpdate,
        users::UserView,
        users::UserPageView,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "auth", description = "Login and logout with bearer tokens"),
        (name = "password", description = "Password reset"),
        (name = "users", description = "Registration, activation and profiles"),
        (name = "health", description = "Liveness"),
    )
)]
struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme("bearer", SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)));
    }
}

/// `OpenAPI` document with info taken from Cargo metadata.
#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    doc.info.title = env!("CARGO_PKG_NAME").to_string();
    doc.info.version = env!("CARGO_PKG_VERSION").to_string();
    doc.info.description = optional_str(env!("CARGO_PKG_DESCRIPTION")).map(str::to_string);
    doc.info.contact = cargo_contact();
    doc.info.license = cargo_license();
    doc
}

fn cargo_contact() -> Option<Contact> {
    // Cargo authors are `;` separated and may include "Name <email>".
    let primary = env!("CARGO_PKG_AUTHORS").split(';').next().map(str::trim)?;
    let (name, email) = parse_author(primary);
    if name.is_none() && email.is_none() {
        return None;
    }

    let mut contact = Contact::new();
    contact.name = name.map(str::to_string);
    contact.email = email.map(str::to_string);
    Some(contact)
}

fn cargo_license() -> Option<License> {
    let identifier = optional_str(env!("CARGO_PKG_LICENSE"))?;
    let mut license = License::new(identifier);
    license.identifier = Some(identifier.to_string());
    Some(license)
}

fn optional_str(value: &str) -> Option<&str> {
    Some(value.trim()).filter(|value| !value.is_empty())
}

fn parse_author(author: &str) -> (Option<&str>, Option<&str>) {
    match author.split_once('<') {
        Some((name, email)) => (
            optional_str(name),
            optional_str(email.trim_end_matches('>')),
        ),
        None => (optional_str(author), None),
    }
}
