//! Banner customization integration tests.

mod common;

use axum::http::StatusCode;
use common::TestHarness;
use priceflex_core::Tier;
use serde_json::json;

fn update_body() -> serde_json::Value {
    json!({
        "class_prefix": "pf-",
        "location_message": "Hello {country}, use {coupon} for {discount}% off",
        "background_color": "#000000",
        "text_color": "#ffffff",
        "font_size": "1rem",
        "banner_container": "body",
        "is_sticky": false
    })
}

#[tokio::test]
async fn new_products_have_default_customization() {
    let harness = TestHarness::new().await;
    let product = harness.create_product("Course", "https://example.com").await;

    let response = harness
        .server
        .get(&format!("/v1/products/{}/customization", product.id))
        .add_header("authorization", harness.user_auth_header())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["can_customize_banner"], false);
    assert_eq!(body["customization"]["background_color"], "hsl(193, 82%, 31%");
    assert_eq!(body["customization"]["is_sticky"], true);
}

#[tokio::test]
async fn free_tier_cannot_customize() {
    let harness = TestHarness::new().await;
    let product = harness.create_product("Course", "https://example.com").await;

    let response = harness
        .server
        .put(&format!("/v1/products/{}/customization", product.id))
        .add_header("authorization", harness.user_auth_header())
        .json(&update_body())
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
    let body: serde_json::Value = response.json();
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .ends_with("upgrade to Standard"));
}

#[tokio::test]
async fn standard_tier_can_customize() {
    let harness = TestHarness::new().await;
    harness.set_tier(Tier::Standard).await;
    let product = harness.create_product("Course", "https://example.com").await;

    let response = harness
        .server
        .put(&format!("/v1/products/{}/customization", product.id))
        .add_header("authorization", harness.user_auth_header())
        .json(&update_body())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["can_customize_banner"], true);
    assert_eq!(body["customization"]["class_prefix"], "pf-");
    assert_eq!(body["customization"]["is_sticky"], false);
}

#[tokio::test]
async fn blank_style_fields_are_rejected() {
    let harness = TestHarness::new().await;
    harness.set_tier(Tier::Premium).await;
    let product = harness.create_product("Course", "https://example.com").await;

    let mut body = update_body();
    body["text_color"] = json!("  ");

    let response = harness
        .server
        .put(&format!("/v1/products/{}/customization", product.id))
        .add_header("authorization", harness.user_auth_header())
        .json(&body)
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn other_users_cannot_read_customization() {
    let harness = TestHarness::new().await;
    let product = harness.create_product("Course", "https://example.com").await;

    let response = harness
        .server
        .get(&format!("/v1/products/{}/customization", product.id))
        .add_header("authorization", TestHarness::other_user_auth_header())
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
}
