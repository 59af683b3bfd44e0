use std::{future::Future, str::FromStr, time::Duration};

use anyhow::Context;
use sqlx::error::ErrorKind;
use sqlx::sqlite::{Sqlite, SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Transaction;
use tracing::warn;

use crate::config::DbConfig;
use crate::error::{ServiceError, ServiceResult};

/// Connection pool plus the deadline every service transaction runs under.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
    tx_timeout: Duration,
}

impl Database {
    pub async fn connect(cfg: &DbConfig) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(&cfg.url)
            .context("parse DATABASE_URL")?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(cfg.busy_timeout_secs));

        let pool = SqlitePoolOptions::new()
            .max_connections(cfg.max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect_with(options)
            .await
            .context("connect to database")?;

        Ok(Self::from_pool(
            pool,
            Duration::from_secs(cfg.tx_timeout_secs),
        ))
    }

    pub fn from_pool(pool: SqlitePool, tx_timeout: Duration) -> Self {
        Self { pool, tx_timeout }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("run migrations")?;
        Ok(())
    }

    /// Run one unit of work under the transaction deadline.
    ///
    /// On timeout the work future is dropped together with any transaction it
    /// holds, and sqlx rolls that transaction back.
    pub async fn run<T, F>(&self, work: F) -> ServiceResult<T>
    where
        F: Future<Output = ServiceResult<T>>,
    {
        match tokio::time::timeout(self.tx_timeout, work).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    timeout_ms = self.tx_timeout.as_millis() as u64,
                    "transaction deadline exceeded"
                );
                Err(ServiceError::Timeout)
            }
        }
    }
}

/// Commit a single-row insert, or roll back and report `None` when the store
/// rejected the row (for example a dangling owner reference).
pub async fn finish_insert(
    tx: Transaction<'_, Sqlite>,
    inserted: Result<i64, sqlx::Error>,
) -> ServiceResult<Option<i64>> {
    match inserted {
        Ok(id) => {
            tx.commit().await?;
            Ok(Some(id))
        }
        Err(e) if is_rejected_row(&e) => {
            warn!(error = %e, "insert rejected");
            tx.rollback().await?;
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Commit when exactly one row was affected, otherwise roll back.
pub async fn finish_single(tx: Transaction<'_, Sqlite>, rows: u64) -> ServiceResult<bool> {
    if rows == 1 {
        tx.commit().await?;
        Ok(true)
    } else {
        tx.rollback().await?;
        Ok(false)
    }
}

pub fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// Rejected by a NOT NULL, CHECK or foreign key constraint: the statement was
/// well-formed but the data was not acceptable.
pub fn is_rejected_row(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db) => matches!(
            db.kind(),
            ErrorKind::NotNullViolation | ErrorKind::CheckViolation | ErrorKind::ForeignKeyViolation
        ),
        _ => false,
    }
}
