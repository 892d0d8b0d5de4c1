//! In-process user store.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::database::DatabaseError;
use crate::user::{NewUser, User, UserId, UserRepository};

#[derive(Debug, Default)]
struct Table {
    next_id: i64,
    rows: HashMap<String, User>,
}

/// [`UserRepository`] keeping rows in memory.
///
/// Mirrors the PostgreSQL schema: ids are assigned in increasing order
/// starting at 1 and `email_address` is unique.
#[derive(Debug, Default)]
pub struct MemoryUserRepository {
    table: RwLock<Table>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users.
    pub async fn len(&self) -> usize {
        self.table.read().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn create_user(&self, user: &NewUser) -> Result<(), DatabaseError> {
        let mut table = self.table.write().await;
        if table.rows.contains_key(&user.email_address) {
            return Err(DatabaseError::UniqueConstraintViolation);
        }

        table.next_id += 1;
        let row = User {
            id: UserId::new(table.next_id),
            display_name: user.display_name.clone(),
            email_address: user.email_address.clone(),
            password: user.password.clone(),
            creation_time: user.creation_time,
        };
        table.rows.insert(row.email_address.clone(), row);

        Ok(())
    }

    async fn password_for_email(
        &self,
        email_address: &str,
    ) -> Result<Vec<u8>, DatabaseError> {
        self.table
            .read()
            .await
            .rows
            .get(email_address)
            .map(|user| user.password.clone())
            .ok_or(DatabaseError::NotFound)
    }

    async fn id_for_email(&self, email_address: &str) -> Result<UserId, DatabaseError> {
        self.table
            .read()
            .await
            .rows
            .get(email_address)
            .map(|user| user.id)
            .ok_or(DatabaseError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::database::DatabaseErrorKind;

    fn user(display_name: &str, email_address: &str, password: &[u8]) -> NewUser {
        NewUser {
            display_name: display_name.into(),
            email_address: email_address.into(),
            password: password.to_vec(),
            creation_time: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_ada_scenario() {
        let users = MemoryUserRepository::new();

        users
            .create_user(&user("Ada", "ada@example.com", &[0x01, 0x02]))
            .await
            .unwrap();

        let err = users
            .create_user(&user("Augusta", "ada@example.com", &[0x03]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), DatabaseErrorKind::UniqueConstraintViolation);

        let password = users.password_for_email("ada@example.com").await.unwrap();
        assert_eq!(password, vec![0x01, 0x02]);

        let err = users.id_for_email("nobody@example.com").await.unwrap_err();
        assert_eq!(err.kind(), DatabaseErrorKind::NotFound);
        assert_eq!(users.len().await, 1);
    }

    #[tokio::test]
    async fn test_ids_are_distinct_and_non_negative() {
        let users = MemoryUserRepository::new();
        users.create_user(&user("A", "a@example.com", b"x")).await.unwrap();
        users.create_user(&user("A", "b@example.com", b"y")).await.unwrap();

        let a = users.id_for_email("a@example.com").await.unwrap();
        let b = users.id_for_email("b@example.com").await.unwrap();
        assert!(a.get() >= 0 && b.get() >= 0);
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_credential_bytes_are_kept_verbatim() {
        let users = MemoryUserRepository::new();
        let credential: Vec<u8> = (0..=255).collect();
        users
            .create_user(&user("Bytes", "bytes@example.com", &credential))
            .await
            .unwrap();

        assert_eq!(
            users.password_for_email("bytes@example.com").await.unwrap(),
            credential
        );
    }

    #[tokio::test]
    async fn test_unknown_email_has_no_password() {
        let users = MemoryUserRepository::new();
        assert!(users.is_empty().await);

        let err = users
            .password_for_email("nobody@example.com")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), DatabaseErrorKind::NotFound);
    }
}
