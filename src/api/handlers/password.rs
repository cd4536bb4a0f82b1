use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;

use super::MessageBody;
use crate::api::error::{ApiError, ErrorBody, RequestContext};
use crate::api::AppState;
use crate::auth::AuthError;
use crate::validation;

#[derive(ToSchema, Deserialize, Debug)]
pub struct PasswordResetRequest {
    email: Option<String>,
}

#[derive(ToSchema, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PasswordUpdate {
    #[schema(format = Password)]
    password: Option<String>,
    password_reset_token: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/1.0/user/password",
    request_body = PasswordResetRequest,
    responses (
        (status = 200, description = "Reset link sent", body = MessageBody),
        (status = 400, description = "Invalid e-mail", body = ErrorBody),
        (status = 404, description = "E-mail not registered", body = ErrorBody),
        (status = 502, description = "Reset e-mail could not be sent", body = ErrorBody),
    ),
    tag = "password"
)]
#[instrument(skip_all)]
pub async fn request_reset(
    ctx: RequestContext,
    Extension(state): Extension<Arc<AppState>>,
    payload: Option<Json<PasswordResetRequest>>,
) -> Result<Json<MessageBody>, ApiError> {
    let email = payload.and_then(|Json(body)| body.email);
    validation::validate_email(email.as_deref())
        .map_err(|errors| ctx.error(AuthError::Validation(errors)))?;

    state
        .reset
        .request_reset(email.as_deref().unwrap_or_default())
        .await
        .map_err(|err| ctx.error(err))?;

    Ok(Json(MessageBody {
        message: ctx.message("password_reset_request_success"),
    }))
}

#[utoipa::path(
    put,
    path = "/api/1.0/user/password",
    request_body = PasswordUpdate,
    responses (
        (status = 200, description = "Password replaced, every session revoked"),
        (status = 400, description = "New password breaks a password rule", body = ErrorBody),
        (status = 403, description = "Reset token unknown or already used", body = ErrorBody),
    ),
    tag = "password"
)]
#[instrument(skip_all)]
pub async fn complete_reset(
    ctx: RequestContext,
    Extension(state): Extension<Arc<AppState>>,
    payload: Option<Json<PasswordUpdate>>,
) -> Result<impl IntoResponse, ApiError> {
    let (password, token) = payload
        .map(|Json(body)| (body.password, body.password_reset_token))
        .unwrap_or_default();
    let Some(token) = token else {
        return Err(ctx.error(AuthError::ForbiddenResetToken));
    };

    state
        .reset
        .complete_reset(&token, password.as_deref())
        .await
        .map_err(|err| ctx.error(err))?;
    Ok(StatusCode::OK)
}
