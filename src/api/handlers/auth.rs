use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;

use crate::api::error::{ApiError, ErrorBody, RequestContext};
use crate::api::AppState;
use crate::auth::{extract_bearer_token, AuthError, LoginOutcome};

#[derive(ToSchema, Deserialize, Debug)]
pub struct Credentials {
    email: Option<String>,
    #[schema(format = Password)]
    password: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/1.0/auth",
    request_body = Credentials,
    responses (
        (status = 200, description = "Authenticated, bearer token issued", body = LoginOutcome),
        (status = 401, description = "Incorrect credentials", body = ErrorBody),
        (status = 403, description = "Account is inactive", body = ErrorBody),
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn login(
    ctx: RequestContext,
    Extension(state): Extension<Arc<AppState>>,
    payload: Option<Json<Credentials>>,
) -> Result<Json<LoginOutcome>, ApiError> {
    let Some(Json(Credentials {
        email: Some(email),
        password: Some(password),
    })) = payload
    else {
        return Err(ctx.error(AuthError::AuthenticationFailure));
    };

    state
        .auth
        .authenticate(&email, &password)
        .await
        .map(Json)
        .map_err(|err| ctx.error(err))
}

#[utoipa::path(
    post,
    path = "/api/1.0/logout",
    responses (
        (status = 200, description = "Token revoked, or there was nothing to revoke"),
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn logout(
    ctx: RequestContext,
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let token = extract_bearer_token(&headers);
    state
        .auth
        .logout(token.as_deref())
        .await
        .map_err(|err| ctx.error(err))?;
    Ok(StatusCode::OK)
}
