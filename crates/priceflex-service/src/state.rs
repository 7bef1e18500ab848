//! Application state.

use std::sync::Arc;

use priceflex_store::Store;

use crate::auth::SessionVerifier;
use crate::config::ServiceConfig;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The storage backend.
    pub store: Arc<dyn Store>,

    /// Service configuration.
    pub config: ServiceConfig,

    /// Session token verifier.
    pub verifier: Arc<dyn SessionVerifier>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        config: ServiceConfig,
        verifier: Arc<dyn SessionVerifier>,
    ) -> Self {
        if config.clerk_webhook_secret.is_none() {
            tracing::warn!("Clerk webhook secret not configured - user webhooks will be refused");
        }

        if config.stripe_webhook_secret.is_none() {
            tracing::warn!(
                "Stripe webhook secret not configured - billing webhooks will be refused"
            );
        }

        if let Some(code) = &config.test_country_code {
            tracing::warn!(country_code = %code, "Banner country forced by TEST_COUNTRY_CODE");
        }

        Self {
            store,
            config,
            verifier,
        }
    }
}
