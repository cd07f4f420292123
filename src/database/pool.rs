use redis::aio::MultiplexedConnection;
use sqlx::{postgres::PgPoolOptions, Pool, Postgres};

use crate::{
    config::Config,
    error::{CacheError, CoreError, QueryError},
};

pub async fn connect(config: &Config) -> Result<Pool<Postgres>, CoreError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
        .map_err(QueryError::from)?;

    log::info!(
        "Connected to database with up to {} connections",
        config.database_max_connections
    );
    Ok(pool)
}

pub async fn migrate(pool: &Pool<Postgres>) -> Result<(), CoreError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| QueryError::from(sqlx::Error::from(e)))?;

    Ok(())
}

pub async fn connect_cache(config: &Config) -> Result<MultiplexedConnection, CoreError> {
    let client = redis::Client::open(config.redis_url.as_str()).map_err(CacheError::from)?;
    let connection = client
        .get_multiplexed_async_connection()
        .await
        .map_err(CacheError::from)?;

    Ok(connection)
}
