mod memory;
mod repository;

pub use memory::*;
pub use repository::*;

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::database::DatabaseError;

/// Store-assigned user identifier.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    sqlx::Type,
)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct UserId(i64);

impl UserId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// User as saved on database.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub display_name: String,
    pub email_address: String,
    /// Opaque, already hashed credential.
    pub password: Vec<u8>,
    pub creation_time: DateTime<Utc>,
}

/// Fields of a user that does not exist yet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewUser {
    pub display_name: String,
    pub email_address: String,
    pub password: Vec<u8>,
    pub creation_time: DateTime<Utc>,
}

/// Persistence operations on the `users` relation.
///
/// Every operation is a single statement: no transaction spans two calls.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user.
    ///
    /// Fails with [`DatabaseError::UniqueConstraintViolation`] when the email
    /// address is already registered.
    async fn create_user(&self, user: &NewUser) -> Result<(), DatabaseError>;

    /// Stored credential of the user owning `email_address`.
    async fn password_for_email(
        &self,
        email_address: &str,
    ) -> Result<Vec<u8>, DatabaseError>;

    /// Identifier of the user owning `email_address`.
    async fn id_for_email(&self, email_address: &str) -> Result<UserId, DatabaseError>;
}
