use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::config;

/// Errors from the persistence layer
#[derive(Debug, Error)]
pub enum DbError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Migration error: {0}")]
    MigrationError(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Explicit database handle. Opened once at startup, passed through
/// application state, closed on shutdown.
#[derive(Clone)]
pub struct Db {
    pool: PgPool,
}

impl Db {
    /// Connect using `DATABASE_URL` and the pool settings from config.
    pub async fn connect() -> Result<Self, DbError> {
        let url = database_url()?;
        let db_config = &config::config().database;

        let pool = PgPoolOptions::new()
            .max_connections(db_config.max_connections)
            .acquire_timeout(Duration::from_secs(db_config.connect_timeout_secs))
            .connect(&url)
            .await?;

        info!("Connected to database");
        Ok(Self { pool })
    }

    /// Build a handle that defers connecting until first use. Used by tests
    /// and tooling that construct state without a reachable server.
    pub fn connect_lazy(url: &str) -> Result<Self, DbError> {
        let pool = PgPoolOptions::new()
            .connect_lazy(url)
            .map_err(|_| DbError::InvalidDatabaseUrl)?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run pending sqlx migrations from `./migrations`.
    pub async fn migrate(&self) -> Result<(), DbError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| DbError::MigrationError(e.to_string()))?;
        info!("Migrations applied");
        Ok(())
    }

    /// Ping the store to verify connectivity.
    pub async fn ping(&self) -> Result<(), DbError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
        info!("Database pool closed");
    }
}

fn database_url() -> Result<String, DbError> {
    let raw = std::env::var("DATABASE_URL").map_err(|_| DbError::ConfigMissing("DATABASE_URL"))?;
    url::Url::parse(&raw).map_err(|_| DbError::InvalidDatabaseUrl)?;
    Ok(raw)
}
