pub mod auth;
pub mod health;
pub mod password;
pub mod users;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Translated confirmation returned by flows that end with an e-mail.
#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct MessageBody {
    pub message: String,
}
