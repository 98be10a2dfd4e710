use std::sync::Arc;

use redis::aio::MultiplexedConnection;
use sqlx::{postgres::PgPoolOptions, Pool, Postgres};

use crate::{config::Config, error::FoodgramError};

pub struct State {
    pub pool: Pool<Postgres>,
    pub cache: Option<MultiplexedConnection>,
    pub config: Config,
    pub session_secret: Arc<str>,
}

impl State {
    /// Connects to Postgres, runs pending migrations and opens the optional
    /// Redis connection. A Redis failure only disables caching.
    pub async fn new(config: Config) -> Result<Arc<Self>, FoodgramError> {
        log::info!("Connecting to database...");
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await?;

        log::info!("Running migrations...");
        sqlx::migrate!("./migrations").run(&pool).await?;

        let cache = match &config.redis_url {
            Some(url) => match connect_cache(url).await {
                Ok(cache) => Some(cache),
                Err(e) => {
                    log::error!("Redis unavailable, caching disabled: {e}");
                    None
                }
            },
            None => None,
        };

        Ok(Self::from_parts(pool, cache, config))
    }

    pub fn from_parts(
        pool: Pool<Postgres>,
        cache: Option<MultiplexedConnection>,
        config: Config,
    ) -> Arc<Self> {
        Arc::new(Self {
            pool,
            cache,
            session_secret: Arc::from(config.session_secret.as_str()),
            config,
        })
    }
}

pub async fn connect_cache(url: &str) -> Result<MultiplexedConnection, FoodgramError> {
    let client = redis::Client::open(url)?;
    Ok(client.get_multiplexed_async_connection().await?)
}
