use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

/// Creates and returns a PostgreSQL connection pool.
///
/// Connections are opened lazily so a database that is down at boot only
/// fails the writes that need it, which the sink then retries.
pub fn create_pool(database_url: &str) -> Result<PgPool> {
    info!("Configuring PostgreSQL pool");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect_lazy(database_url)?;

    Ok(pool)
}
