use support_desk::config::ServerConfig;
use support_desk::{app, AppState};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present (development convenience)
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "support_desk=debug,tower_http=debug".into()),
        )
        .init();

    let config = ServerConfig::from_env();
    info!(
        "Allowing credentialed requests from {}; uploads capped at {} bytes",
        config.frontend_origin, config.max_upload_bytes
    );

    let state = AppState::new(&config);
    let app = app(state, &config)?;

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{addr}/");

    axum::serve(listener, app).await?;
    Ok(())
}
