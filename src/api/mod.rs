//! HTTP surface: router assembly and server bootstrap.

use anyhow::{Context, Result};
use axum::extract::{MatchedPath, Request};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, HeaderValue, Method};
use axum::middleware as axum_middleware;
use axum::routing::{delete, get, post};
use axum::{Extension, Router};
use secrecy::SecretString;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::request_id::PropagateRequestIdLayer;
use tower_http::set_header::SetRequestHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, info_span};
use ulid::Ulid;
use url::Url;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::account::postgres::PgAccountStore;
use crate::auth::config::AuthConfig;
use crate::auth::mailer::LogRecoveryMailer;
use crate::auth::secret::SecretStore;
use crate::auth::state::AuthState;
use crate::auth::token::SessionSigner;

use self::handlers::{accounts, auth as auth_handlers, health, root};

pub mod handlers;
pub mod middleware;
mod openapi;

pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

/// Build the application router around a prepared state. Split from
/// [`new`] so tests can drive the full surface without a listener.
#[must_use]
pub fn app(state: Arc<AuthState>) -> Router {
    let protected = Router::new()
        .route("/v1/auth/session", get(auth_handlers::session::session))
        .route(
            "/v1/auth/password",
            post(auth_handlers::password::change_password),
        )
        .route("/v1/auth/account", delete(auth_handlers::session::deactivate))
        .route_layer(axum_middleware::from_fn(middleware::require_session));

    // Layered so the session gate runs before the role gate.
    let admin = Router::new()
        .route("/v1/accounts", get(accounts::list))
        .route_layer(axum_middleware::from_fn(middleware::restrict_to_admin))
        .route_layer(axum_middleware::from_fn(middleware::require_session));

    Router::new()
        .route("/", get(root::root))
        .route("/health", get(health::health))
        .route("/v1/auth/signup", post(auth_handlers::signup::signup))
        .route("/v1/auth/login", post(auth_handlers::login::login))
        .route(
            "/v1/auth/recover",
            post(auth_handlers::recovery::request_recovery),
        )
        .route(
            "/v1/auth/recover/complete",
            post(auth_handlers::recovery::complete_recovery),
        )
        .merge(protected)
        .merge(admin)
        .merge(
            SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", openapi::ApiDoc::openapi()),
        )
        .layer(Extension(state))
}

/// Connect to the store, run migrations, and serve until shutdown.
///
/// # Errors
///
/// Fails when the database is unreachable, migrations fail, the signing
/// key is too weak, the frontend URL does not parse, or the port cannot be
/// bound.
pub async fn new(
    port: u16,
    dsn: String,
    signing_key: SecretString,
    config: AuthConfig,
) -> Result<()> {
    // Connect to database
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(&dsn)
        .await
        .context("Failed to connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    let signer = SessionSigner::new(signing_key, config.session_token_ttl_seconds())
        .context("Failed to build session signer")?;

    let origin = frontend_origin(config.frontend_base_url())?;

    let state = Arc::new(AuthState::new(
        config,
        SecretStore::new(),
        signer,
        Arc::new(PgAccountStore::new(pool)),
        Arc::new(LogRecoveryMailer),
    ));

    let cors = CorsLayer::new()
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_origin(AllowOrigin::exact(origin))
        .allow_credentials(true);

    let router = app(state).layer(
        ServiceBuilder::new()
            .layer(SetRequestHeaderLayer::if_not_present(
                HeaderName::from_static("x-request-id"),
                |_request: &_| HeaderValue::from_str(&Ulid::new().to_string()).ok(),
            ))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http().make_span_with(make_span))
            .layer(cors),
    );

    let listener = TcpListener::bind(format!("::0:{port}"))
        .await
        .with_context(|| format!("Failed to bind port {port}"))?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Failed to start server")?;

    Ok(())
}

fn make_span(request: &Request) -> tracing::Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("none");

    let matched_path = request.extensions().get::<MatchedPath>().map_or_else(
        || request.uri().path().to_string(),
        |path| path.as_str().to_string(),
    );

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

fn frontend_origin(frontend_base_url: &str) -> Result<HeaderValue> {
    let url = Url::parse(frontend_base_url)
        .with_context(|| format!("invalid frontend URL: {frontend_base_url}"))?;
    let origin = url.origin().ascii_serialization();
    HeaderValue::from_str(&origin).context("failed to build CORS origin header")
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {err}");
        return;
    }
    info!("Gracefully shutdown");
}

#[cfg(test)]
mod tests {
    use super::frontend_origin;

    #[test]
    fn test_frontend_origin_strips_path() {
        let origin = frontend_origin("https://rezervi.dev/app/").unwrap();
        assert_eq!(origin, "https://rezervi.dev");
    }

    #[test]
    fn test_frontend_origin_keeps_port() {
        let origin = frontend_origin("http://localhost:3000").unwrap();
        assert_eq!(origin, "http://localhost:3000");
    }

    #[test]
    fn test_frontend_origin_rejects_garbage() {
        assert!(frontend_origin("not a url").is_err());
    }
}
