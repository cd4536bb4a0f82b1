use anyhow::{anyhow, Context, Result};
use axum::{
    body::Body,
    extract::{Extension, MatchedPath},
    http::{
        header::{ACCEPT_LANGUAGE, AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method, Request,
    },
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;
use url::Url;
use utoipa_swagger_ui::SwaggerUi;

use crate::accounts::Accounts;
use crate::auth::{Authenticator, CleanupHandle, PasswordReset};

pub mod error;
pub mod handlers;
mod openapi;

pub use openapi::openapi;

use handlers::{auth, health, password, users};

/// Services shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub auth: Authenticator,
    pub reset: PasswordReset,
    pub accounts: Accounts,
}

/// Build the API router: every documented route, request ids and tracing.
#[must_use]
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/1.0/auth", post(auth::login))
        .route("/api/1.0/logout", post(auth::logout))
        .route(
            "/api/1.0/user/password",
            post(password::request_reset).put(password::complete_reset),
        )
        .route("/api/1.0/users", get(users::list).post(users::register))
        .route("/api/1.0/users/token/:token", post(users::activate))
        .route(
            "/api/1.0/users/:id",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(state)),
        )
}

/// Serve until ctrl-c, then stop the token cleanup task.
///
/// # Errors
/// Return error if the listener cannot bind or the frontend URL is invalid.
pub async fn new(
    port: u16,
    state: Arc<AppState>,
    frontend_base_url: &str,
    cleanup: CleanupHandle,
) -> Result<()> {
    let cors = CorsLayer::new()
        .allow_headers([CONTENT_TYPE, AUTHORIZATION, ACCEPT_LANGUAGE])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_origin(AllowOrigin::exact(frontend_origin(frontend_base_url)?));

    let app = router(state).layer(cors);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!("failed to listen for shutdown signal: {err}");
            }
            info!("Gracefully shutdown");
        })
        .await?;

    cleanup.stop().await;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

fn frontend_origin(frontend_base_url: &str) -> Result<HeaderValue> {
    let parsed = Url::parse(frontend_base_url)
        .with_context(|| format!("Invalid frontend base URL: {frontend_base_url}"))?;
    let host = parsed.host_str().ok_or_else(|| {
        anyhow!("Frontend base URL must include a valid host: {frontend_base_url}")
    })?;
    let port = parsed
        .port()
        .map_or_else(String::new, |port| format!(":{port}"));
    let origin = format!("{}://{}{}", parsed.scheme(), host, port);
    HeaderValue::from_str(&origin).context("Failed to build frontend origin header")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frontend_origin_strips_path_and_fragment() -> Result<()> {
        let origin = frontend_origin("http://localhost:8080/#/login")?;
        assert_eq!(origin, "http://localhost:8080");
        let origin = frontend_origin("https://accounts.dev/app/")?;
        assert_eq!(origin, "https://accounts.dev");
        Ok(())
    }

    #[test]
    fn frontend_origin_requires_host() {
        assert!(frontend_origin("not a url").is_err());
        assert!(frontend_origin("file:///tmp").is_err());
    }
}
