//! Loads `ingredients.csv` and `tags.csv` from `DATA_DIR` into the catalog.

use foodgram_sdk::{
    actions::import_catalog, cache::invalidate_catalog_cache, config::Config,
    error::FoodgramError, state::connect_cache,
};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    if let Err(e) = run().await {
        log::error!("Import failed: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), FoodgramError> {
    let config = Config::load()?;

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let report = import_catalog(&config.data_dir, &pool).await?;
    log::info!(
        "Imported {}/{} ingredients and {}/{} tags",
        report.ingredients_inserted,
        report.ingredients_read,
        report.tags_inserted,
        report.tags_read
    );

    if let Some(url) = &config.redis_url {
        let mut cache = connect_cache(url).await?;
        invalidate_catalog_cache(&mut cache).await?;
        log::info!("Catalog cache invalidated");
    }

    Ok(())
}
