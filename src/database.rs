use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::warn;

use crate::configuration::DatabaseSettings;

pub async fn get_connection_pool(settings: &DatabaseSettings) -> Result<SqlitePool, sqlx::Error> {
    let connect_options = SqliteConnectOptions::from_str(&settings.url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5));

    // Every connection to `:memory:` opens a separate database.
    let max_connections = if settings.is_in_memory() {
        1
    } else {
        settings.max_connections.max(1)
    };

    let mut retries = 0;
    loop {
        let mut options = SqlitePoolOptions::new().max_connections(max_connections);
        if settings.is_in_memory() {
            options = options.idle_timeout(None).max_lifetime(None);
        }

        match options.connect_with(connect_options.clone()).await {
            Ok(pool) => return Ok(pool),
            Err(e) => {
                if retries >= settings.max_connection_retries {
                    return Err(e);
                }
                retries += 1;
                warn!(
                    "Database connection failed (attempt {}/{}): {}",
                    retries, settings.max_connection_retries, e
                );
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        }
    }
}

pub async fn migrate_database(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| sqlx::Error::Protocol(format!("Migration error: {}", e)))
}

/// Connects and runs migrations in one step.
pub async fn setup_database(settings: &DatabaseSettings) -> Result<SqlitePool, sqlx::Error> {
    let pool = get_connection_pool(settings).await?;
    migrate_database(&pool).await?;
    Ok(pool)
}
