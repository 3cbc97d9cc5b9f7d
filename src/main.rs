use std::sync::Arc;

use ats_checker::{
    config::{Config, LogFormat},
    create_router,
    services::{OpenAiClient, OpenAiSettings, ResultStore, SqliteResultStore, UnavailableStore},
    AppState,
};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    init_tracing(LogFormat::from_env()?);

    let config = Config::from_env()?;

    tracing::info!("Starting ATS Checker v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Max file size: {}MB", config.max_file_size_mb);
    tracing::info!("Max concurrent requests: {}", config.max_concurrent_requests);

    let completion = OpenAiClient::new(OpenAiSettings::from_config(&config))?;
    tracing::info!("Completion client initialized (model: {})", config.openai_model);

    // Records are best effort, so a missing database must not stop the service
    let store: Arc<dyn ResultStore> = match SqliteResultStore::connect(&config.database_url).await {
        Ok(store) => Arc::new(store),
        Err(e) => {
            tracing::error!("Database connection error: {} (analysis records will not be saved)", e);
            Arc::new(UnavailableStore::new(e.to_string()))
        }
    };

    let state = AppState::new(&config, Arc::new(completion), store);
    let app = create_router(state);

    let addr = format!("{}:{}", config.server_host, config.server_port);
    tracing::info!("Server listening on {}", addr);

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "ats_checker=debug,tower_http=debug,axum::rejection=trace".into());

    let (pretty, json) = match format {
        LogFormat::Pretty => (Some(tracing_subscriber::fmt::layer().with_target(false)), None),
        LogFormat::Json => (None, Some(tracing_subscriber::fmt::layer().json())),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(pretty)
        .with(json)
        .init();
}
