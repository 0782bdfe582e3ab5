use grok_relay::{create_router, AppState, Config};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse configuration from CLI args, environment, and .env
    let config = Config::parse_args();

    let addr = config.socket_addr()?;

    // Log the upstream safely (scheme + host only, never the key)
    let safe_url = match url::Url::parse(&config.base_url) {
        Ok(url) => format!("{}://{}", url.scheme(), url.host_str().unwrap_or("unknown")),
        Err(_) => "invalid-url".to_string(),
    };

    let state = AppState::new(config.clone());
    let app = create_router(state);

    info!("grok-relay listening on http://{}", addr);
    info!("Upstream: {}", safe_url);
    info!("Chat model: {}", config.chat_model);
    info!(
        "API key: {}",
        if config.api_key.is_some() {
            "configured"
        } else {
            "MISSING"
        }
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;

    Ok(())
}
