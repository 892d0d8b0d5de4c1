//! Route registry.
pub mod home;
pub mod login_or_signup;
pub mod metrics;
pub mod session;
pub mod user;

use axum::Router;
use axum::extract::{FromRequest, Request};
use axum::routing::{get, post};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::AppState;
use crate::error::ServerError;
use crate::middleware::{AuthenticatedHandler, Identity, protect};

/// Well-known paths.
pub mod paths {
    pub const HOME: &str = "/";
    pub const LOGIN_OR_SIGNUP: &str = "/login-or-signup";
    pub const USER: &str = "/user";
    pub const SESSION: &str = "/session";
    pub const METRICS: &str = "/metrics";
}

const BODY_LIMIT: usize = 30_000;

/// JSON body checked with [`Validate`] before reaching the handler.
///
/// The `Content-Type` header is not checked: the login page posts JSON
/// with the browser's default form type.
#[derive(Debug, Clone, Copy, Default)]
pub struct Valid<T>(pub T);

impl<T, S> FromRequest<S> for Valid<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request(req: Request, _state: &S) -> Result<Self, Self::Rejection> {
        let body = axum::body::to_bytes(req.into_body(), BODY_LIMIT)
            .await
            .map_err(|err| ServerError::ParsingForm(Box::new(err)))?;
        let value = serde_json::from_slice::<T>(&body)
            .map_err(|err| ServerError::ParsingForm(Box::new(err)))?;
        value.validate()?;
        Ok(Valid(value))
    }
}

/// Mount `handler` on `path`, reachable only with a valid session.
fn handle_authenticated<H>(
    router: Router<AppState>,
    state: &AppState,
    path: &str,
    handler: H,
) -> Router<AppState>
where
    H: AuthenticatedHandler,
{
    router.route(path, protect(state.verifier(), paths::LOGIN_OR_SIGNUP, handler))
}

/// Bind every route of the application.
pub fn routes(state: &AppState) -> Router<AppState> {
    let router = Router::new()
        // templates
        .route(paths::LOGIN_OR_SIGNUP, get(login_or_signup::handler))
        // forms
        .route(paths::USER, post(user::create))
        .route(paths::SESSION, post(session::create).delete(session::delete))
        .route(paths::METRICS, get(metrics::handler));

    // requires authentication
    let home_state = state.clone();
    handle_authenticated(router, state, paths::HOME, move |_req: Request, identity: Identity| {
        home::handler(home_state.clone(), identity)
    })
}
