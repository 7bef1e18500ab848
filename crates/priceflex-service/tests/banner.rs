//! Public banner integration tests.

mod common;

use axum::http::StatusCode;
use chrono::Utc;
use common::TestHarness;
use priceflex_core::{CountryGroupDiscount, Product, Tier};
use priceflex_store::Store;
use serde_json::Value;

/// Create a product with a 60% discount for the group containing India.
async fn discounted_product(harness: &TestHarness) -> Product {
    let product = harness
        .create_product("Course", "https://shop.example.com")
        .await;

    let groups = harness
        .store
        .get_country_groups(product.id, &harness.test_user_id)
        .await
        .unwrap();
    let group = groups
        .iter()
        .find(|g| g.countries.iter().any(|c| c.code == "IN"))
        .unwrap();

    harness
        .store
        .insert_country_group_discount(&CountryGroupDiscount {
            country_group_id: group.group.id,
            product_id: product.id,
            coupon: "PPP60".into(),
            discount_percentage: 0.6,
        })
        .await
        .unwrap();

    product
}

#[tokio::test]
async fn banner_is_shown_for_discounted_country() {
    let harness = TestHarness::new().await;
    let product = discounted_product(&harness).await;

    let response = harness
        .server
        .get(&format!("/api/products/{}/banner", product.id))
        .add_header("referer", "https://shop.example.com/")
        .add_header("x-country-code", "in")
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["country"], "India");
    assert_eq!(body["coupon"], "PPP60");
    assert_eq!(body["discount_percentage"], 60.0);
    assert_eq!(body["show_branding"], true);
    let message = body["message"].as_str().unwrap();
    assert!(message.contains("<b>India</b>"));
    assert!(message.contains("\"PPP60\""));
    assert!(message.contains("<b>60%</b>"));

    assert_eq!(harness.store.row_counts().await.views, 1);
}

#[tokio::test]
async fn paid_tier_hides_branding() {
    let harness = TestHarness::new().await;
    harness.set_tier(Tier::Basic).await;
    let product = discounted_product(&harness).await;

    let body: Value = harness
        .server
        .get(&format!("/api/products/{}/banner", product.id))
        .add_header("origin", "https://shop.example.com")
        .add_header("x-country-code", "IN")
        .await
        .json();

    assert_eq!(body["show_branding"], false);
}

#[tokio::test]
async fn country_without_discount_records_view_only() {
    let harness = TestHarness::new().await;
    let product = discounted_product(&harness).await;

    let response = harness
        .server
        .get(&format!("/api/products/{}/banner", product.id))
        .add_header("referer", "https://shop.example.com")
        .add_header("x-country-code", "US")
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(harness.store.row_counts().await.views, 1);
}

#[tokio::test]
async fn missing_referer_is_not_found() {
    let harness = TestHarness::new().await;
    let product = discounted_product(&harness).await;

    let response = harness
        .server
        .get(&format!("/api/products/{}/banner", product.id))
        .add_header("x-country-code", "IN")
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(harness.store.row_counts().await.views, 0);
}

#[tokio::test]
async fn foreign_site_is_not_found() {
    let harness = TestHarness::new().await;
    let product = discounted_product(&harness).await;

    let response = harness
        .server
        .get(&format!("/api/products/{}/banner", product.id))
        .add_header("referer", "https://elsewhere.example.com")
        .add_header("x-country-code", "IN")
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(harness.store.row_counts().await.views, 0);
}

#[tokio::test]
async fn visits_over_quota_are_recorded_but_not_shown() {
    let harness = TestHarness::new().await;
    let product = discounted_product(&harness).await;

    let quota = Tier::Free.limits().max_number_of_visits;
    for _ in 0..quota {
        harness
            .store
            .record_product_view(product.id, None, Utc::now())
            .await
            .unwrap();
    }

    let response = harness
        .server
        .get(&format!("/api/products/{}/banner", product.id))
        .add_header("referer", "https://shop.example.com")
        .add_header("x-country-code", "IN")
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
    let recorded = u64::try_from(harness.store.row_counts().await.views).unwrap();
    assert_eq!(recorded, quota + 1);
}

#[tokio::test]
async fn test_country_code_overrides_header() {
    let mut config = common::test_config();
    config.test_country_code = Some("IN".into());
    let harness = TestHarness::with_config(config).await;
    let product = discounted_product(&harness).await;

    let body: Value = harness
        .server
        .get(&format!("/api/products/{}/banner", product.id))
        .add_header("referer", "https://shop.example.com")
        .add_header("x-country-code", "US")
        .await
        .json();

    assert_eq!(body["country"], "India");
}
