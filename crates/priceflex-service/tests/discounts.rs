//! Country group discount integration tests.

mod common;

use axum::http::StatusCode;
use common::TestHarness;
use serde_json::{json, Value};

fn group<'a>(groups: &'a Value, name: &str) -> &'a Value {
    groups
        .as_array()
        .unwrap()
        .iter()
        .find(|g| g["name"] == name)
        .unwrap_or_else(|| panic!("missing group {name}"))
}

#[tokio::test]
async fn lists_all_groups_with_recommendations() {
    let harness = TestHarness::new().await;
    let product = harness.create_product("Course", "https://example.com").await;

    let response = harness
        .server
        .get(&format!("/v1/products/{}/countries", product.id))
        .add_header("authorization", harness.user_auth_header())
        .await;

    response.assert_status_ok();
    let groups: Value = response.json();
    assert_eq!(groups.as_array().unwrap().len(), 7);

    let india = group(&groups, "Group 7");
    assert_eq!(india["recommended_discount_percentage"], 60.0);
    assert!(india["discount"].is_null());
    assert!(india["countries"]
        .as_array()
        .unwrap()
        .iter()
        .any(|c| c["code"] == "IN"));

    assert!(group(&groups, "Group 1")["recommended_discount_percentage"].is_null());
}

#[tokio::test]
async fn discounts_are_set_and_cleared() {
    let harness = TestHarness::new().await;
    let product = harness.create_product("Course", "https://example.com").await;
    let path = format!("/v1/products/{}/countries", product.id);

    let groups: Value = harness
        .server
        .get(&path)
        .add_header("authorization", harness.user_auth_header())
        .await
        .json();
    let group_id = group(&groups, "Group 7")["id"].clone();

    let response = harness
        .server
        .put(&path)
        .add_header("authorization", harness.user_auth_header())
        .json(&json!({
            "groups": [{
                "country_group_id": group_id,
                "coupon": "PPP60",
                "discount_percentage": 60
            }]
        }))
        .await;

    response.assert_status_ok();
    let groups: Value = response.json();
    let discount = &group(&groups, "Group 7")["discount"];
    assert_eq!(discount["coupon"], "PPP60");
    assert_eq!(discount["discount_percentage"], 60.0);

    let response = harness
        .server
        .put(&path)
        .add_header("authorization", harness.user_auth_header())
        .json(&json!({ "groups": [{ "country_group_id": group_id }] }))
        .await;

    response.assert_status_ok();
    let groups: Value = response.json();
    assert!(group(&groups, "Group 7")["discount"].is_null());
    assert_eq!(harness.store.row_counts().await.discounts, 0);
}

#[tokio::test]
async fn half_filled_entry_is_rejected() {
    let harness = TestHarness::new().await;
    let product = harness.create_product("Course", "https://example.com").await;
    let path = format!("/v1/products/{}/countries", product.id);

    let groups: Value = harness
        .server
        .get(&path)
        .add_header("authorization", harness.user_auth_header())
        .await
        .json();
    let group_id = group(&groups, "Group 2")["id"].clone();

    let response = harness
        .server
        .put(&path)
        .add_header("authorization", harness.user_auth_header())
        .json(&json!({
            "groups": [{ "country_group_id": group_id, "coupon": "HALF" }]
        }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(harness.store.row_counts().await.discounts, 0);
}

#[tokio::test]
async fn other_users_cannot_edit_discounts() {
    let harness = TestHarness::new().await;
    let product = harness.create_product("Course", "https://example.com").await;

    let response = harness
        .server
        .put(&format!("/v1/products/{}/countries", product.id))
        .add_header("authorization", TestHarness::other_user_auth_header())
        .json(&json!({ "groups": [] }))
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
}
