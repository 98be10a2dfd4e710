use std::{net::SocketAddr, sync::Arc};

use tokio::signal::ctrl_c;

use crate::{error::FoodgramError, state::State};

use super::routes::routes;

/// Serves the API until Ctrl+C or SIGTERM.
pub async fn start_server(state: Arc<State>) -> Result<(), FoodgramError> {
    let address = SocketAddr::from(([0, 0, 0, 0], state.config.port));
    log::info!("Binding to {address}");

    let (address, server) = warp::serve(routes(state))
        .try_bind_with_graceful_shutdown(address, shutdown_signal())
        .map_err(|e| FoodgramError::Config(format!("Failed to bind {address}: {e}")))?;

    log::info!("Server running on {address}");
    server.await;
    log::info!("Server shutting down...");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match ctrl_c().await {
            Ok(()) => log::info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                log::error!("Failed to install Ctrl+C handler: {e}");
                std::future::pending::<()>().await
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                log::info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                log::error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
