#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

mod calendar_ops;
mod job_ops;
mod mappers;
mod ports;
mod technician_ops;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::error::{DispatchError, Result};

pub const SCHEMA_SQL: &str = include_str!("../../schema.sql");

/// Postgres-backed implementation of every store port.
#[derive(Clone)]
pub struct DispatchDb {
    pool: PgPool,
}

impl DispatchDb {
    /// # Errors
    /// Returns [`DispatchError::DatabaseError`] when the connection cannot be established.
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        Self::connect(&config.url, config.max_connections).await
    }

    /// # Errors
    /// Returns [`DispatchError::DatabaseError`] when the connection cannot be established.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections.max(1))
            .acquire_timeout(Duration::from_secs(3))
            .connect(database_url)
            .await
            .map_err(|e| DispatchError::DatabaseError(format!("Failed to connect to database: {e}")))?;

        info!(max_connections, "Connected to PostgreSQL dispatch database");
        Ok(Self { pool })
    }

    #[must_use]
    pub const fn new_with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply the bundled schema; every statement is `IF NOT EXISTS`.
    ///
    /// # Errors
    /// Returns [`DispatchError::DatabaseError`] on the first failing statement.
    pub async fn initialize_schema(&self) -> Result<()> {
        for statement in schema_statements(SCHEMA_SQL) {
            sqlx::query(statement)
                .execute(self.pool())
                .await
                .map_err(|e| {
                    DispatchError::DatabaseError(format!("Failed to initialize schema: {e}"))
                })?;
        }
        Ok(())
    }
}

fn schema_statements(sql: &str) -> impl Iterator<Item = &str> {
    sql.split(';')
        .map(str::trim)
        .filter(|statement| {
            statement
                .lines()
                .any(|line| !line.trim().is_empty() && !line.trim_start().starts_with("--"))
        })
}
