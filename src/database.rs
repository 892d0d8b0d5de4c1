//! PostgreSQL connection manager.
mod error;

pub use error::*;

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::{Connection, PgPool};

pub const DEFAULT_POOL_SIZE: u32 = 10;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle on the relational store, shared by every repository.
#[derive(Clone, Debug)]
pub struct Database {
    pub postgres: PgPool,
}

impl Database {
    /// Open a pool on `url` and check it answers a ping.
    ///
    /// Nothing is returned unless both steps succeed, so a failed call
    /// never leaves a usable handle behind.
    pub async fn connect(url: &str, pool_size: u32) -> Result<Self, DatabaseError> {
        let postgres = PgPoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect_lazy(url)
            .map_err(DatabaseError::ConnectionFailure)?;

        let mut conn = postgres
            .acquire()
            .await
            .map_err(DatabaseError::ConnectionFailure)?;
        conn.ping().await.map_err(DatabaseError::ConnectionFailure)?;

        tracing::info!(pool_size, "postgres connected");

        Ok(Self { postgres })
    }

    /// Apply the bundled migrations.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.postgres).await
    }
}
