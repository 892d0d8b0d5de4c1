use axum::Json;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::AppState;
use crate::database::DatabaseError;
use crate::error::{Result, ServerError};
use crate::router::Valid;
use crate::user::UserId;

#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Body {
    #[validate(email(message = "Email must be formatted."))]
    pub email_address: String,
    #[validate(length(min = 1, max = 255))]
    pub password: String,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub user_id: UserId,
    pub expires_in: u64,
}

/// Unknown users and wrong passwords are reported the same way.
fn hide_not_found(err: DatabaseError) -> ServerError {
    match err {
        DatabaseError::NotFound => ServerError::InvalidCredentials,
        err => err.into(),
    }
}

/// Handler to log in: checks credentials and sets the session cookie.
pub async fn create(
    State(state): State<AppState>,
    Valid(body): Valid<Body>,
) -> Result<impl IntoResponse> {
    let credential = state
        .users
        .password_for_email(&body.email_address)
        .await
        .map_err(hide_not_found)?;

    if !state.passwords.verify_password(&body.password, &credential)? {
        return Err(ServerError::InvalidCredentials);
    }

    let user_id = state
        .users
        .id_for_email(&body.email_address)
        .await
        .map_err(hide_not_found)?;

    let token = state.sessions.create(user_id, &body.email_address)?;
    let cookie = state.sessions.cookie(&token)?;

    tracing::info!(%user_id, "session opened");

    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie)],
        Json(Response {
            user_id,
            expires_in: state.sessions.lifetime(),
        }),
    ))
}

/// Handler to log out.
pub async fn delete(State(state): State<AppState>) -> Result<impl IntoResponse> {
    Ok((
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, state.sessions.expired_cookie()?)],
    ))
}
