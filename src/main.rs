use dsme_reports::AppState;
use dsme_reports::config::Config;
use dsme_reports::routes::report_routes;
use tokio::net::TcpListener; //TCP listener
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main] // the program entry point using the Tokio async runtime.
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(?config, "starting DSME report service");
    let state = AppState::from_config(&config);

    // Warm the store handle before taking traffic. Failure is not fatal: the
    // handlers retry initialization and report the error per request.
    match state.store.store().await {
        Ok(_) => info!("report store ready"),
        Err(e) => warn!("report store not initialized at startup: {}", e),
    }

    let app = report_routes::app(state, config.cors_allow_origin.as_deref());

    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!("Server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
