//! Common test utilities for priceflex integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum_test::TestServer;
use chrono::Utc;

use priceflex_core::{BillingUpdate, NewUserSubscription, Product, ProductDetails, Tier, UserId};
use priceflex_service::auth::AuthError;
use priceflex_service::config::StripePriceIds;
use priceflex_service::{clerk, create_router, stripe, AppState, ServiceConfig, SessionVerifier};
use priceflex_store::{bundled_country_groups, MemoryStore, Store};

/// Svix secret used by the test config: base64 of `priceflex-test-secret`.
pub const CLERK_WEBHOOK_SECRET: &str = "whsec_cHJpY2VmbGV4LXRlc3Qtc2VjcmV0";
/// Stripe secret used by the test config.
pub const STRIPE_WEBHOOK_SECRET: &str = "whsec_stripe_test";
/// Price ID mapped to the Basic tier.
pub const BASIC_PRICE_ID: &str = "price_basic";
/// Price ID mapped to the Standard tier.
pub const STANDARD_PRICE_ID: &str = "price_standard";
/// Price ID mapped to the Premium tier.
pub const PREMIUM_PRICE_ID: &str = "price_premium";

/// Accepts tokens of the form `test-token:<user id>`.
pub struct StaticVerifier;

#[async_trait]
impl SessionVerifier for StaticVerifier {
    async fn verify(&self, token: &str) -> Result<UserId, AuthError> {
        token
            .strip_prefix("test-token:")
            .and_then(|user| user.parse().ok())
            .ok_or_else(|| AuthError::InvalidToken("unknown test token".into()))
    }
}

/// Configuration with both webhook secrets and all price IDs set.
pub fn test_config() -> ServiceConfig {
    ServiceConfig {
        listen_addr: "127.0.0.1:0".into(),
        clerk_webhook_secret: Some(CLERK_WEBHOOK_SECRET.into()),
        stripe_webhook_secret: Some(STRIPE_WEBHOOK_SECRET.into()),
        stripe_price_ids: StripePriceIds {
            basic: Some(BASIC_PRICE_ID.into()),
            standard: Some(STANDARD_PRICE_ID.into()),
            premium: Some(PREMIUM_PRICE_ID.into()),
        },
        ..ServiceConfig::default()
    }
}

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// The store behind the server, for seeding and inspection.
    pub store: Arc<MemoryStore>,
    /// A test user ID for authenticated requests.
    pub test_user_id: UserId,
}

impl TestHarness {
    /// Create a new test harness with the bundled country groups loaded.
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    /// Create a harness with a custom configuration.
    pub async fn with_config(config: ServiceConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        store
            .sync_country_groups(&bundled_country_groups().expect("Bundled seed parses"))
            .await
            .expect("Failed to seed country groups");

        let state = AppState::new(store.clone(), config, Arc::new(StaticVerifier));
        let router: Router = create_router(state);

        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            store,
            test_user_id: "user_test".parse().expect("Valid user id"),
        }
    }

    /// Get the authorization header for user authentication.
    pub fn user_auth_header(&self) -> String {
        auth_header(&self.test_user_id)
    }

    /// Get a different user's auth header (for testing isolation).
    pub fn other_user_auth_header() -> String {
        "Bearer test-token:user_other".to_string()
    }

    /// Put the test user on `tier`.
    pub async fn set_tier(&self, tier: Tier) {
        set_tier(&self.store, &self.test_user_id, tier).await;
    }

    /// Create a product for the test user directly in the store.
    pub async fn create_product(&self, name: &str, url: &str) -> Product {
        self.store
            .create_product(
                &self.test_user_id,
                &ProductDetails {
                    name: name.into(),
                    url: url.into(),
                    description: None,
                },
            )
            .await
            .expect("Failed to create product")
    }
}

/// Bearer header for `user_id`.
pub fn auth_header(user_id: &UserId) -> String {
    format!("Bearer test-token:{user_id}")
}

/// Ensure `user_id` has a subscription on `tier`.
pub async fn set_tier(store: &MemoryStore, user_id: &UserId, tier: Tier) {
    store
        .create_user_subscription(&NewUserSubscription {
            user_id: user_id.clone(),
            tier: Tier::Free,
        })
        .await
        .expect("Failed to create subscription");
    store
        .update_subscription_by_user(
            user_id,
            &BillingUpdate {
                tier: Some(tier),
                ..BillingUpdate::default()
            },
        )
        .await
        .expect("Failed to set tier");
}

/// Svix headers signing `body` with the test secret.
pub fn clerk_headers(body: &str) -> Vec<(&'static str, String)> {
    let id = "msg_test";
    let timestamp = Utc::now().timestamp();
    let signature =
        clerk::sign(body, id, timestamp, CLERK_WEBHOOK_SECRET).expect("Test secret is base64");

    vec![
        (clerk::ID_HEADER, id.to_string()),
        (clerk::TIMESTAMP_HEADER, timestamp.to_string()),
        (clerk::SIGNATURE_HEADER, signature),
    ]
}

/// `stripe-signature` header value signing `body` with the test secret.
pub fn stripe_signature(body: &str) -> String {
    stripe::sign(body, STRIPE_WEBHOOK_SECRET, Utc::now().timestamp())
}
