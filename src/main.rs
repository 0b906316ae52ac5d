use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wedding_site::{
    api::ApiClient,
    config::Config,
    router::{create_router, shutdown_signal},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.rust_log))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let client = ApiClient::new(&config.api_base_url, config.api_timeout)
        .context("Cannot build the backend HTTP client")?;
    tracing::info!(
        "Using wedding backend at {} (timeout {:?})",
        client.base_url(),
        config.api_timeout
    );

    let bind_addr = config.bind_addr;
    let app = create_router(config, Arc::new(client));

    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("Cannot listen on {bind_addr}"))?;
    tracing::info!("Listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
