//! Handle database requests.

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::database::{Database, DatabaseError, classify};
use crate::user::{NewUser, UserId, UserRepository};

/// [`UserRepository`] backed by PostgreSQL.
#[derive(Clone, Debug)]
pub struct PgUserRepository {
    pool: Pool<Postgres>,
}

impl PgUserRepository {
    /// Create a new [`PgUserRepository`].
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.postgres.clone(),
        }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create_user(&self, user: &NewUser) -> Result<(), DatabaseError> {
        let result = classify(
            sqlx::query(
                r#"INSERT INTO users (display_name, email_address, password, creation_time)
                    VALUES ($1, $2, $3, $4)"#,
            )
            .bind(&user.display_name)
            .bind(&user.email_address)
            .bind(&user.password)
            .bind(user.creation_time)
            .execute(&self.pool)
            .await,
        )?;

        // A plain insert acknowledges exactly one row.
        match result.rows_affected() {
            1 => Ok(()),
            rows => Err(DatabaseError::InvariantViolation(format!(
                "insert into users affected {rows} rows"
            ))),
        }
    }

    async fn password_for_email(
        &self,
        email_address: &str,
    ) -> Result<Vec<u8>, DatabaseError> {
        classify(
            sqlx::query_scalar::<_, Vec<u8>>(
                r#"SELECT password FROM users WHERE email_address = $1"#,
            )
            .bind(email_address)
            .fetch_one(&self.pool)
            .await,
        )
    }

    async fn id_for_email(&self, email_address: &str) -> Result<UserId, DatabaseError> {
        classify(
            sqlx::query_scalar::<_, UserId>(
                r#"SELECT id FROM users WHERE email_address = $1"#,
            )
            .bind(email_address)
            .fetch_one(&self.pool)
            .await,
        )
    }
}
