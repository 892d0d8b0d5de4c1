//! Cereal Notes keeps user accounts and guards the pages that need a
//! logged in user.

#![forbid(unsafe_code)]
pub mod config;
pub mod crypto;
pub mod database;
pub mod error;
pub mod middleware;
mod router;
pub mod session;
pub mod telemetry;
pub mod user;

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::http::{StatusCode, header};
use axum::{Router, middleware as AxumMiddleware};
use metrics_exporter_prometheus::PrometheusHandle;
use tower::ServiceBuilder;
use tower_http::LatencyUnit;
use tower_http::sensitive_headers::SetSensitiveHeadersLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};

pub use error::ServerError;
pub use router::paths;

use crate::config::Configuration;
use crate::crypto::PasswordManager;
use crate::database::{DEFAULT_POOL_SIZE, Database};
use crate::middleware::SessionVerifier;
use crate::session::SessionManager;
use crate::user::{PgUserRepository, UserRepository};

/// MUST NEVER be used in production.
#[cfg(test)]
pub async fn make_request(
    app: Router,
    method: axum::http::Method,
    path: &str,
    body: String,
    cookie: Option<&str>,
) -> axum::http::Response<axum::body::Body> {
    use axum::extract::Request;
    use tower::util::ServiceExt;

    let mut request = Request::builder()
        .method(method)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        request = request.header(header::COOKIE, cookie);
    }

    app.oneshot(request.body(axum::body::Body::from(body)).unwrap())
        .await
        .unwrap()
}

/// State sharing between routes.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Configuration>,
    pub users: Arc<dyn UserRepository>,
    pub passwords: Arc<PasswordManager>,
    pub sessions: Arc<SessionManager>,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Session capability used by the authentication gate.
    pub fn verifier(&self) -> Arc<dyn SessionVerifier> {
        self.sessions.clone()
    }
}

/// Create router.
pub fn app(state: AppState) -> Router {
    let middleware = ServiceBuilder::new()
        // Add high level tracing/logging to all requests.
        .layer(
            TraceLayer::new_for_http()
                .on_body_chunk(|chunk: &Bytes, latency: Duration, _span: &tracing::Span| {
                    tracing::trace!(size_bytes = chunk.len(), latency = ?latency, "sending body chunk")
                })
                .make_span_with(DefaultMakeSpan::new().include_headers(true).level(tracing::Level::INFO))
                .on_request(DefaultOnRequest::new())
                .on_response(DefaultOnResponse::new().include_headers(true).latency_unit(LatencyUnit::Micros)),
        )
        // Set a timeout.
        .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, Duration::from_secs(10)))
        // Remove senstive headers from trace.
        .layer(SetSensitiveHeadersLayer::new([
            header::AUTHORIZATION,
            header::COOKIE,
            header::SET_COOKIE,
        ]));

    router::routes(&state)
        .with_state(state)
        .route_layer(AxumMiddleware::from_fn(telemetry::track))
        .layer(middleware)
}

/// Errors aborting startup.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    #[error(transparent)]
    Database(#[from] database::DatabaseError),
    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error(transparent)]
    Crypto(#[from] crypto::CryptoError),
}

/// Initialize the application state.
pub async fn initialize_state(
    config: Arc<Configuration>,
    metrics: Option<PrometheusHandle>,
) -> Result<AppState, StartupError> {
    let url = config.database_url()?;
    let pool_size = config
        .postgres
        .as_ref()
        .and_then(|postgres| postgres.pool_size)
        .unwrap_or(DEFAULT_POOL_SIZE);

    let db = Database::connect(url.as_str(), pool_size).await?;

    if config.postgres.as_ref().is_some_and(|postgres| postgres.migrate) {
        db.migrate().await?;
        tracing::info!("migrations applied");
    }

    let passwords = PasswordManager::new(config.argon2.clone())?;
    let sessions = SessionManager::new(
        &config.name,
        config.session_secret()?,
        config.session.expiration_seconds,
    )
    .secure(config.session.secure_cookie);

    Ok(AppState {
        users: Arc::new(PgUserRepository::new(&db)),
        passwords: Arc::new(passwords),
        sessions: Arc::new(sessions),
        metrics,
        config,
    })
}
