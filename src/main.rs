use foodgram_sdk::{config::Config, server::start_server, state::State};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    if let Err(e) = run().await {
        log::error!("{e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), foodgram_sdk::error::FoodgramError> {
    let config = Config::load()?;

    log::info!("Initializing state...");
    let state = State::new(config).await?;

    log::info!("Starting server...");
    start_server(state).await
}
