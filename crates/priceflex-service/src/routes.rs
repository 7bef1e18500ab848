//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{
    analytics, banner, customization, dashboard, discounts, health, marketing, products,
    subscription, webhooks,
};
use crate::state::AppState;

/// Maximum concurrent requests for dashboard API endpoints.
const API_MAX_CONCURRENT_REQUESTS: usize = 50;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
/// - `GET /` - Marketing page
/// - `GET /api/products/:id/banner` - Discount banner (any origin)
///
/// ## Dashboard (Clerk session)
/// - `GET /v1/dashboard` - Products overview
/// - `GET|POST /v1/products` - List or create products
/// - `GET|PUT|DELETE /v1/products/:id` - One product
/// - `GET|PUT /v1/products/:id/customization` - Banner customization
/// - `GET|PUT /v1/products/:id/countries` - Country group discounts
/// - `GET /v1/analytics` - View analytics
/// - `GET /v1/subscription` - Current tier and usage
///
/// ## Webhooks (Signature verification)
/// - `POST /api/webhooks/clerk` - Clerk user events
/// - `POST /api/webhooks/stripe` - Stripe subscription events
pub fn create_router(state: AppState) -> Router {
    // Extract config values before moving state
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    let api_routes = Router::new()
        .route("/dashboard", get(dashboard::get_dashboard))
        // Products
        .route(
            "/products",
            get(products::list_products).post(products::create_product),
        )
        .route(
            "/products/:id",
            get(products::get_product)
                .put(products::update_product)
                .delete(products::delete_product),
        )
        .route(
            "/products/:id/customization",
            get(customization::get_customization).put(customization::update_customization),
        )
        .route(
            "/products/:id/countries",
            get(discounts::get_country_discounts).put(discounts::update_country_discounts),
        )
        // Analytics & billing
        .route("/analytics", get(analytics::get_analytics))
        .route("/subscription", get(subscription::get_subscription))
        .layer(ConcurrencyLimitLayer::new(API_MAX_CONCURRENT_REQUESTS));

    let app_routes = Router::new()
        .route("/health", get(health::health))
        .route("/", get(marketing::home))
        .nest("/v1", api_routes)
        // Webhooks (no rate limit - controlled by external services)
        .route("/api/webhooks/clerk", post(webhooks::clerk_webhook))
        .route("/api/webhooks/stripe", post(webhooks::stripe_webhook))
        .layer(cors);

    // The banner is embedded on customer sites, so any origin may load it.
    let banner_routes = Router::new()
        .route("/api/products/:id/banner", get(banner::get_banner))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    app_routes
        .merge(banner_routes)
        // Global middleware
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
