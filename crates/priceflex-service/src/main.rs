//! PriceFlex Service - HTTP API for PPP pricing banners
//!
//! This is the main entry point for the priceflex service.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use priceflex_service::{create_router, AppState, JwksVerifier, ServiceConfig};
use priceflex_store::{bundled_country_groups, PgStore, Store};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is fine; the environment may already be set.
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,priceflex=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting PriceFlex Service");

    let config = ServiceConfig::from_env()?;

    tracing::info!(
        listen_addr = %config.listen_addr,
        clerk_issuer = %config.clerk_issuer,
        clerk_webhooks = config.clerk_webhook_secret.is_some(),
        stripe_webhooks = config.stripe_webhook_secret.is_some(),
        "Service configuration loaded"
    );

    let store = PgStore::connect(&config.database_url, config.database_max_connections).await?;
    store.migrate().await?;

    if config.sync_country_groups {
        let summary = store.sync_country_groups(&bundled_country_groups()?).await?;
        tracing::info!(
            country_groups = summary.country_groups,
            countries = summary.countries,
            "Country groups synced"
        );
    }

    let verifier = JwksVerifier::new(&config.clerk_issuer, config.clerk_audience.clone());
    let state = AppState::new(Arc::new(store), config.clone(), Arc::new(verifier));

    let app = create_router(state);
    tracing::info!("Router configured with all API endpoints");

    tracing::info!(listen_addr = %config.listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
