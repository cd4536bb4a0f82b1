//! Uniform error responses.
//!
//! Every failure leaves the service as
//! `{"path", "timestamp", "message", "validationErrors"?}` with the message
//! translated for the caller's `Accept-Language`.

use axum::{
    async_trait,
    extract::{FromRequestParts, OriginalUri},
    http::{header::ACCEPT_LANGUAGE, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;
use std::convert::Infallible;
use tracing::error;
use utoipa::ToSchema;

use crate::auth::AuthError;
use crate::i18n::{translate, Lang};

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub path: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_errors: Option<BTreeMap<String, String>>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Request path and language, needed to render any error or message.
#[derive(Clone, Debug)]
pub struct RequestContext {
    pub path: String,
    pub lang: Lang,
}

impl RequestContext {
    #[must_use]
    pub fn message(&self, key: &str) -> String {
        translate(self.lang, key).to_string()
    }

    /// Render a core error for this request.
    #[must_use]
    pub fn error(&self, err: AuthError) -> ApiError {
        let status = err.status();
        if let AuthError::Store(source) = &err {
            error!(path = %self.path, "request failed: {source:#}");
        }
        let validation_errors = match &err {
            AuthError::Validation(errors) => Some(
                errors
                    .iter()
                    .map(|(field, key)| (field.to_string(), self.message(key)))
                    .collect(),
            ),
            _ => None,
        };
        ApiError {
            status,
            body: ErrorBody {
                path: self.path.clone(),
                timestamp: Utc::now().timestamp_millis(),
                message: self.message(err.message_key()),
                validation_errors,
            },
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let path = parts
            .extensions
            .get::<OriginalUri>()
            .map_or_else(|| parts.uri.path(), |uri| uri.0.path())
            .to_string();
        let lang = Lang::from_accept_language(
            parts
                .headers
                .get(ACCEPT_LANGUAGE)
                .and_then(|value| value.to_str().ok()),
        );
        Ok(Self { path, lang })
    }
}
