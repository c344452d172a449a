//! Subcommand implementations.

pub mod discount;
pub mod migrate;
pub mod seed;

use sqlx::PgPool;
use thiserror::Error;

use joestar_api::config::{ConfigError, get_database_url};
use joestar_api::db::{PgStore, RepositoryError};
use joestar_api::seed::SeedError;

/// Errors shared by the database-backed commands.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Database URL missing or invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration failed.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Seed files could not be read or applied.
    #[error(transparent)]
    Seed(#[from] SeedError),

    /// Store write failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// Bad command-line input.
    #[error("{0}")]
    InvalidInput(String),
}

/// Connect to the database named by `JOESTAR_DATABASE_URL` (or `DATABASE_URL`).
async fn connect() -> Result<PgPool, CommandError> {
    dotenvy::dotenv().ok();

    let database_url = get_database_url("JOESTAR_DATABASE_URL")?;

    tracing::info!("Connecting to database...");
    Ok(joestar_api::db::create_pool(&database_url).await?)
}

/// Connect and wrap the pool in a store.
async fn connect_store() -> Result<PgStore, CommandError> {
    Ok(PgStore::new(connect().await?))
}
