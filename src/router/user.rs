use axum::extract::State;
use axum::http::StatusCode;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::AppState;
use crate::error::Result;
use crate::router::Valid;
use crate::user::NewUser;

#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Body {
    #[validate(length(
        min = 1,
        max = 64,
        message = "Display name must contain between 1 and 64 characters."
    ))]
    pub display_name: String,
    #[validate(email(message = "Email must be formatted."))]
    pub email_address: String,
    #[validate(length(
        min = 8,
        max = 255,
        message = "Password must contain at least 8 characters."
    ))]
    pub password: String,
}

/// Handler to create user.
pub async fn create(
    State(state): State<AppState>,
    Valid(body): Valid<Body>,
) -> Result<StatusCode> {
    let password = state.passwords.hash_password(&body.password)?;

    state
        .users
        .create_user(&NewUser {
            display_name: body.display_name,
            email_address: body.email_address,
            password,
            creation_time: Utc::now(),
        })
        .await?;

    tracing::info!("user created");

    Ok(StatusCode::CREATED)
}
