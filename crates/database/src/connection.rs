use crate::error::DbError;
use configuration::DatabaseSettings;
use dotenvy::dotenv;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Opens a connection pool with the default pool settings.
pub async fn connect(database_url: &str) -> Result<SqlitePool, DbError> {
    connect_with(database_url, &DatabaseSettings::default()).await
}

/// Opens a connection pool to the SQLite database at `database_url`,
/// creating the database file if it does not exist yet.
///
/// An in-memory database lives only as long as its connection, so
/// `sqlite::memory:` URLs get a single connection that is never recycled.
pub async fn connect_with(database_url: &str, settings: &DatabaseSettings) -> Result<SqlitePool, DbError> {
    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

    let in_memory = database_url.contains(":memory:");
    let mut pool = SqlitePoolOptions::new()
        .max_connections(if in_memory { 1 } else { settings.max_connections })
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs));
    if in_memory {
        pool = pool.idle_timeout(None).max_lifetime(None);
    }

    let pool = pool.connect_with(options).await?;
    tracing::debug!(url = %database_url, "Database pool ready");
    Ok(pool)
}

/// Loads `.env` (if present) and connects to `DATABASE_URL`, falling back to
/// the URL from the settings file.
pub async fn connect_from_env(settings: &DatabaseSettings) -> Result<SqlitePool, DbError> {
    // A missing .env file is fine, the variable may come from the environment.
    let _ = dotenv();

    let database_url = env::var("DATABASE_URL")
        .ok()
        .or_else(|| settings.url.clone())
        .ok_or_else(|| DbError::ConnectionConfigError("DATABASE_URL must be set.".to_string()))?;

    connect_with(&database_url, settings).await
}

/// Applies the embedded migrations so the schema is up to date.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), DbError> {
    // Use a relative path from the crate root
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
