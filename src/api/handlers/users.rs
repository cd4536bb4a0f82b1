use axum::{
    extract::{Extension, Path, Query},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::MessageBody;
use crate::accounts::page_params;
use crate::api::error::{ApiError, ErrorBody, RequestContext};
use crate::api::AppState;
use crate::auth::{AuthError, Ownership};
use crate::store::User;

#[derive(ToSchema, Deserialize, Debug)]
pub struct Registration {
    username: Option<String>,
    email: Option<String>,
    #[schema(format = Password)]
    password: Option<String>,
}

#[derive(ToSchema, Deserialize, Debug)]
pub struct UserUpdate {
    username: Option<String>,
}

/// Public view of an account.
#[derive(ToSchema, Serialize, Debug, PartialEq, Eq)]
pub struct UserView {
    id: Uuid,
    username: String,
    email: String,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
        }
    }
}

#[derive(ToSchema, Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UserPageView {
    content: Vec<UserView>,
    page: u32,
    size: u32,
    total_pages: u64,
}

/// Raw values; anything unparsable falls back to the defaults.
#[derive(IntoParams, Deserialize, Debug, Default)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// Zero-based page index, default 0.
    page: Option<String>,
    /// Page size between 1 and 100, default 10.
    size: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/1.0/users",
    request_body = Registration,
    responses (
        (status = 200, description = "Account created, activation e-mail sent", body = MessageBody),
        (status = 400, description = "Validation failure", body = ErrorBody),
        (status = 502, description = "Activation e-mail could not be sent", body = ErrorBody),
    ),
    tag = "users"
)]
#[instrument(skip_all)]
pub async fn register(
    ctx: RequestContext,
    Extension(state): Extension<Arc<AppState>>,
    payload: Option<Json<Registration>>,
) -> Result<Json<MessageBody>, ApiError> {
    let (username, email, password) = payload
        .map(|Json(body)| (body.username, body.email, body.password))
        .unwrap_or_default();

    state
        .accounts
        .register(username.as_deref(), email.as_deref(), password.as_deref())
        .await
        .map_err(|err| ctx.error(err))?;

    Ok(Json(MessageBody {
        message: ctx.message("user_create_success"),
    }))
}

#[utoipa::path(
    post,
    path = "/api/1.0/users/token/{token}",
    params(("token" = String, Path, description = "Activation token from the e-mail link")),
    responses (
        (status = 200, description = "Account activated", body = MessageBody),
        (status = 400, description = "Unknown token or account already active", body = ErrorBody),
    ),
    tag = "users"
)]
#[instrument(skip_all)]
pub async fn activate(
    ctx: RequestContext,
    Extension(state): Extension<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<Json<MessageBody>, ApiError> {
    state
        .accounts
        .activate(&token)
        .await
        .map_err(|err| ctx.error(err))?;
    Ok(Json(MessageBody {
        message: ctx.message("account_activation_success"),
    }))
}

#[utoipa::path(
    get,
    path = "/api/1.0/users",
    params(PageQuery),
    responses (
        (status = 200, description = "Active users, oldest first, without the caller", body = UserPageView),
    ),
    security((), ("bearer" = [])),
    tag = "users"
)]
#[instrument(skip_all)]
pub async fn list(
    ctx: RequestContext,
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<PageQuery>,
) -> Result<Json<UserPageView>, ApiError> {
    let (page, size) = page_params(query.page.as_deref(), query.size.as_deref());

    let caller = state
        .auth
        .optional_bearer(&headers)
        .await
        .map_err(|err| ctx.error(err))?;
    let result = state
        .accounts
        .list(caller.as_ref(), page, size)
        .await
        .map_err(|err| ctx.error(err))?;

    Ok(Json(UserPageView {
        content: result.users.into_iter().map(UserView::from).collect(),
        page,
        size,
        total_pages: result.total.div_ceil(u64::from(size)),
    }))
}

#[utoipa::path(
    get,
    path = "/api/1.0/users/{id}",
    params(("id" = String, Path, description = "User id")),
    responses (
        (status = 200, description = "Active user", body = UserView),
        (status = 404, description = "No active user with this id", body = ErrorBody),
    ),
    tag = "users"
)]
#[instrument(skip_all)]
pub async fn get_user(
    ctx: RequestContext,
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<UserView>, ApiError> {
    let id = Uuid::parse_str(&id).map_err(|_| ctx.error(AuthError::UserNotFound))?;
    let user = state
        .accounts
        .get(id)
        .await
        .map_err(|err| ctx.error(err))?;
    Ok(Json(user.into()))
}

/// Resolve the caller and the target id of an owner-only operation. Any
/// token problem or unparsable id is reported as an ownership failure.
async fn owner_and_target(
    ctx: &RequestContext,
    state: &AppState,
    headers: &HeaderMap,
    id: &str,
    op: Ownership,
) -> Result<(User, Uuid), ApiError> {
    let caller = match state.auth.require_bearer(headers).await {
        Ok(user) => user,
        Err(err) if err.is_token_failure() => {
            return Err(ctx.error(AuthError::ForbiddenOwnership(op)))
        }
        Err(err) => return Err(ctx.error(err)),
    };
    let id = Uuid::parse_str(id).map_err(|_| ctx.error(AuthError::ForbiddenOwnership(op)))?;
    Ok((caller, id))
}

#[utoipa::path(
    put,
    path = "/api/1.0/users/{id}",
    params(("id" = String, Path, description = "User id, must be the caller")),
    request_body = UserUpdate,
    responses (
        (status = 200, description = "Username updated", body = UserView),
        (status = 400, description = "Validation failure", body = ErrorBody),
        (status = 403, description = "Not authenticated as this user", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "users"
)]
#[instrument(skip_all)]
pub async fn update_user(
    ctx: RequestContext,
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    payload: Option<Json<UserUpdate>>,
) -> Result<Json<UserView>, ApiError> {
    let (caller, id) = owner_and_target(&ctx, &state, &headers, &id, Ownership::Update).await?;
    let username = payload.and_then(|Json(body)| body.username);
    let user = state
        .accounts
        .update_username(&caller, id, username.as_deref())
        .await
        .map_err(|err| ctx.error(err))?;
    Ok(Json(user.into()))
}

#[utoipa::path(
    delete,
    path = "/api/1.0/users/{id}",
    params(("id" = String, Path, description = "User id, must be the caller")),
    responses (
        (status = 200, description = "Account and its tokens deleted"),
        (status = 403, description = "Not authenticated as this user", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "users"
)]
#[instrument(skip_all)]
pub async fn delete_user(
    ctx: RequestContext,
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let (caller, id) = owner_and_target(&ctx, &state, &headers, &id, Ownership::Delete).await?;
    state
        .accounts
        .delete(&caller, id)
        .await
        .map_err(|err| ctx.error(err))?;
    Ok(StatusCode::OK)
}
