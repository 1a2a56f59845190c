use anyhow::Context;
use blog_assistant::{
    create_router, AiClient, AppState, Config, GeminiBackend, PostStore, Publisher,
    WordPressClient,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    info!("Starting blog assistant server");

    let config = Config::from_env()?;
    info!("Connecting to database: {}", config.masked_database_url());

    let store = PostStore::connect(&config.database_url)
        .await
        .context("failed to connect to database; is PostgreSQL running?")?;
    store.setup_schema().await?;

    // Probe the publishing target once at startup; the probed settings are
    // what the drafting endpoint uses for the life of the process.
    let publisher = WordPressClient::new();
    let wordpress = match config.wordpress.clone() {
        Some(mut settings) => {
            settings.is_connected = publisher.validate_connection(&settings).await;
            if settings.is_connected {
                info!("WordPress connection validated: {}", settings.site_url);
            } else {
                warn!("WordPress settings present but validation failed; drafting disabled");
            }
            Some(settings)
        }
        None => None,
    };

    let api_key = config.gemini_api_key.clone().unwrap_or_default();
    let ai = AiClient::new(Box::new(GeminiBackend::new(api_key)));

    let state = Arc::new(AppState {
        ai,
        store,
        publisher: Box::new(publisher),
        wordpress,
    });
    let app = create_router(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    info!("Server listening on http://{}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
