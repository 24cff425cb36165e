use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use front_page::api::ContentClient;
use front_page::app::App;
use front_page::config::Config;
use front_page::routes::{self, AppState};
use front_page::view::PageSettings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "front_page=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path =
        std::env::var("FRONT_PAGE_CONFIG").unwrap_or_else(|_| "frontpage.toml".to_string());
    let config = Config::load(&config_path)?;
    info!(
        "Loaded configuration from {} ({} sections)",
        config_path,
        config.sections.len()
    );

    // Start the page controller; it fetches the first batch right away
    let client = ContentClient::from_config(&config);
    let app = App::start(&config, client.clone());

    let state = Arc::new(AppState {
        remote: app.remote(),
        client,
        settings: Arc::new(PageSettings::from_config(&config)),
        poll_timeout: routes::FRAME_POLL_TIMEOUT,
    });

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!("Server starting on http://{}", config.listen_addr);

    axum::serve(listener, routes::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    app.stop().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutting down");
}
