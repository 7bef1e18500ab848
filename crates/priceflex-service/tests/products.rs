//! Product management integration tests.

mod common;

use axum::http::StatusCode;
use common::TestHarness;
use priceflex_core::Tier;
use serde_json::json;

// ============================================================================
// Creation
// ============================================================================

#[tokio::test]
async fn create_product_success() {
    let harness = TestHarness::new().await;

    let response = harness
        .server
        .post("/v1/products")
        .add_header("authorization", harness.user_auth_header())
        .json(&json!({
            "name": "Rust Course",
            "url": "https://example.com/course/",
            "description": "  "
        }))
        .await;

    response.assert_status(StatusCode::CREATED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["name"], "Rust Course");
    assert_eq!(body["url"], "https://example.com/course");
    assert!(body["description"].is_null());
    assert_eq!(body["owner"], harness.test_user_id.to_string());
}

#[tokio::test]
async fn create_product_validates_input() {
    let harness = TestHarness::new().await;

    let response = harness
        .server
        .post("/v1/products")
        .add_header("authorization", harness.user_auth_header())
        .json(&json!({ "name": "Course", "url": "ftp://example.com" }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "validation_error");
    assert_eq!(body["error"]["details"]["field"], "url");
}

#[tokio::test]
async fn free_tier_cannot_create_second_product() {
    let harness = TestHarness::new().await;
    harness.create_product("First", "https://one.example.com").await;

    let response = harness
        .server
        .post("/v1/products")
        .add_header("authorization", harness.user_auth_header())
        .json(&json!({ "name": "Second", "url": "https://two.example.com" }))
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn concurrent_creates_stop_at_tier_limit() {
    let harness = TestHarness::new().await;
    harness.set_tier(Tier::Basic).await;
    for i in 0..4 {
        harness
            .create_product(&format!("Product {i}"), &format!("https://p{i}.example.com"))
            .await;
    }

    let post = |name: &'static str| {
        let server = &harness.server;
        let auth = harness.user_auth_header();
        async move {
            server
                .post("/v1/products")
                .add_header("authorization", auth)
                .json(&json!({ "name": name, "url": "https://new.example.com" }))
                .await
                .status_code()
        }
    };
    let (a, b, c) = tokio::join!(post("A"), post("B"), post("C"));

    let statuses = [a, b, c];
    let created = statuses
        .iter()
        .filter(|s| **s == StatusCode::CREATED)
        .count();
    assert_eq!(created, 1);
    assert!(statuses
        .iter()
        .all(|s| *s == StatusCode::CREATED || *s == StatusCode::FORBIDDEN));
    assert_eq!(harness.store.row_counts().await.products, 5);
}

// ============================================================================
// Access
// ============================================================================

#[tokio::test]
async fn products_are_scoped_to_their_owner() {
    let harness = TestHarness::new().await;
    let product = harness.create_product("Course", "https://example.com").await;

    let response = harness
        .server
        .get(&format!("/v1/products/{}", product.id))
        .add_header("authorization", TestHarness::other_user_auth_header())
        .await;
    response.assert_status(StatusCode::NOT_FOUND);

    let response = harness
        .server
        .get(&format!("/v1/products/{}", product.id))
        .add_header("authorization", harness.user_auth_header())
        .await;
    response.assert_status_ok();
}

#[tokio::test]
async fn malformed_product_id_is_not_found() {
    let harness = TestHarness::new().await;

    let response = harness
        .server
        .get("/v1/products/not-a-uuid")
        .add_header("authorization", harness.user_auth_header())
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_products_returns_own_products() {
    let harness = TestHarness::new().await;
    harness.create_product("Course", "https://example.com").await;

    let body: serde_json::Value = harness
        .server
        .get("/v1/products")
        .add_header("authorization", harness.user_auth_header())
        .await
        .json();
    assert_eq!(body.as_array().unwrap().len(), 1);

    let body: serde_json::Value = harness
        .server
        .get("/v1/products")
        .add_header("authorization", TestHarness::other_user_auth_header())
        .await
        .json();
    assert!(body.as_array().unwrap().is_empty());
}

// ============================================================================
// Update & Delete
// ============================================================================

#[tokio::test]
async fn update_product_replaces_details() {
    let harness = TestHarness::new().await;
    let product = harness.create_product("Course", "https://example.com").await;

    let response = harness
        .server
        .put(&format!("/v1/products/{}", product.id))
        .add_header("authorization", harness.user_auth_header())
        .json(&json!({
            "name": "Course v2",
            "url": "https://example.com/v2",
            "description": "Second edition"
        }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["name"], "Course v2");
    assert_eq!(body["description"], "Second edition");
}

#[tokio::test]
async fn delete_product_removes_it() {
    let harness = TestHarness::new().await;
    let product = harness.create_product("Course", "https://example.com").await;
    let path = format!("/v1/products/{}", product.id);

    harness
        .server
        .delete(&path)
        .add_header("authorization", harness.user_auth_header())
        .await
        .assert_status(StatusCode::NO_CONTENT);

    harness
        .server
        .get(&path)
        .add_header("authorization", harness.user_auth_header())
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let counts = harness.store.row_counts().await;
    assert_eq!(counts.products, 0);
    assert_eq!(counts.customizations, 0);
}
