//! Authentication gate for routes.
//!
//! [`protect`] turns an [`AuthenticatedHandler`], which needs to know who is
//! calling, into a plain route. Each request is checked on its own by the
//! [`authenticate`] middleware: a verified session runs the handler, anything
//! else is redirected to the login page.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{Extension, Request, State};
use axum::http::request::Parts;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{MethodRouter, get};
use serde::Serialize;

use crate::user::UserId;

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// Caller resolved from a verified session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub user_id: UserId,
    pub email_address: String,
}

/// Reason a session was refused. Never sent to the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("no session credential")]
    Missing,
    #[error("session credential is malformed")]
    Malformed,
    #[error("session has expired")]
    Expired,
    #[error("session credential is not valid")]
    Invalid,
}

/// Capability resolving the caller of a request.
#[async_trait]
pub trait SessionVerifier: Send + Sync {
    async fn verify(&self, parts: &Parts) -> Result<Identity, AuthError>;
}

/// Handler that runs only once the caller is known.
pub trait AuthenticatedHandler: Clone + Send + Sync + 'static {
    fn call(&self, req: Request, identity: Identity) -> BoxFuture<Response>;
}

impl<F, Fut, R> AuthenticatedHandler for F
where
    F: Fn(Request, Identity) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse,
{
    fn call(&self, req: Request, identity: Identity) -> BoxFuture<Response> {
        let fut = self(req, identity);
        Box::pin(async move { fut.await.into_response() })
    }
}

/// State of the [`authenticate`] middleware.
#[derive(Clone)]
pub struct Gate {
    verifier: Arc<dyn SessionVerifier>,
    login_path: &'static str,
}

/// Custom middleware for authentication.
///
/// Stores the resolved [`Identity`] in the request extensions.
pub async fn authenticate(State(gate): State<Gate>, req: Request, next: Next) -> Response {
    let (parts, body) = req.into_parts();

    match gate.verifier.verify(&parts).await {
        Ok(identity) => {
            let mut req = Request::from_parts(parts, body);
            req.extensions_mut().insert(identity);
            next.run(req).await
        },
        Err(reason) => {
            tracing::debug!(%reason, path = %parts.uri.path(), "unauthenticated request redirected");
            Redirect::to(gate.login_path).into_response()
        },
    }
}

/// Wrap `handler` so it only runs for `GET` requests carrying a valid
/// session.
///
/// Unauthenticated requests get a redirect to `login_path` and never reach
/// `handler`.
pub fn protect<H, S>(
    verifier: Arc<dyn SessionVerifier>,
    login_path: &'static str,
    handler: H,
) -> MethodRouter<S>
where
    H: AuthenticatedHandler,
    S: Clone + Send + Sync + 'static,
{
    let gate = Gate {
        verifier,
        login_path,
    };

    get(move |Extension(identity): Extension<Identity>, req: Request| handler.call(req, identity))
        .route_layer(middleware::from_fn_with_state(gate, authenticate))
}
