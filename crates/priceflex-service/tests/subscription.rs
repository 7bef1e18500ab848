//! Subscription endpoint integration tests.

mod common;

use chrono::Utc;
use common::TestHarness;
use priceflex_core::Tier;
use priceflex_store::Store;
use serde_json::Value;

#[tokio::test]
async fn users_without_subscription_are_on_free() {
    let harness = TestHarness::new().await;

    let response = harness
        .server
        .get("/v1/subscription")
        .add_header("authorization", harness.user_auth_header())
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["tier"], "Free");
    assert_eq!(body["limits"]["max_number_of_products"], 1);
    assert_eq!(body["product_count"], 0);
    assert_eq!(body["can_create_product"], true);
    assert_eq!(body["can_show_discount_banner"], true);
}

#[tokio::test]
async fn usage_counts_products_and_visits() {
    let harness = TestHarness::new().await;
    harness.set_tier(Tier::Standard).await;
    let product = harness.create_product("Course", "https://example.com").await;
    harness
        .store
        .record_product_view(product.id, None, Utc::now())
        .await
        .unwrap();

    let body: Value = harness
        .server
        .get("/v1/subscription")
        .add_header("authorization", harness.user_auth_header())
        .await
        .json();

    assert_eq!(body["tier"], "Standard");
    assert_eq!(body["product_count"], 1);
    assert_eq!(body["visits_this_month"], 1);
    assert_eq!(body["limits"]["can_customize_banner"], true);
}
