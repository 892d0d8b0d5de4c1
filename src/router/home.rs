//! Home page, for logged in users only.

use axum::Json;
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::middleware::Identity;
use crate::user::UserId;

#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub name: String,
    pub user_id: UserId,
    pub email_address: String,
}

pub async fn handler(state: AppState, identity: Identity) -> Json<Response> {
    Json(Response {
        name: state.config.name.clone(),
        user_id: identity.user_id,
        email_address: identity.email_address,
    })
}
