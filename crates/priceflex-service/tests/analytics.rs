//! Analytics integration tests.

mod common;

use axum::http::StatusCode;
use chrono::{TimeZone, Utc};
use common::TestHarness;
use priceflex_core::Tier;
use priceflex_store::Store;
use serde_json::Value;

#[tokio::test]
async fn free_tier_gets_fallback() {
    let harness = TestHarness::new().await;

    let response = harness
        .server
        .get("/v1/analytics")
        .add_header("authorization", harness.user_auth_header())
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["interval"], "last30Days");
    assert_eq!(body["timezone"], "UTC");
    assert_eq!(body["analytics"]["status"], "fallback");
    assert_eq!(body["intervals"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn empty_thirty_day_chart_is_zero_filled() {
    let harness = TestHarness::new().await;
    harness.set_tier(Tier::Basic).await;

    let body: Value = harness
        .server
        .get("/v1/analytics?interval=last30Days")
        .add_header("authorization", harness.user_auth_header())
        .await
        .json();

    let days = body["analytics"]["data"]["views_by_day"].as_array().unwrap();
    assert_eq!(days.len(), 30);
    assert!(days.iter().all(|d| d["views"] == 0));

    let dates: Vec<&str> = days.iter().map(|d| d["date"].as_str().unwrap()).collect();
    let mut sorted = dates.clone();
    sorted.sort_unstable();
    assert_eq!(dates, sorted);

    let groups = body["analytics"]["data"]["views_by_country_group"]
        .as_array()
        .unwrap();
    assert_eq!(groups.len(), 7);
}

#[tokio::test]
async fn unknown_timezone_is_rejected() {
    let harness = TestHarness::new().await;

    let response = harness
        .server
        .get("/v1/analytics?timezone=Mars/Olympus_Mons")
        .add_header("authorization", harness.user_auth_header())
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn days_are_bucketed_in_the_display_timezone() {
    let harness = TestHarness::new().await;
    harness.set_tier(Tier::Basic).await;
    let product = harness.create_product("Course", "https://example.com").await;

    let visited_at = Utc.with_ymd_and_hms(2024, 3, 10, 2, 30, 0).unwrap();
    harness
        .store
        .record_product_view(product.id, None, visited_at)
        .await
        .unwrap();

    let body: Value = harness
        .server
        .get("/v1/analytics?interval=allTime&timezone=America/New_York")
        .add_header("authorization", harness.user_auth_header())
        .await
        .json();

    assert_eq!(body["timezone"], "America/New_York");
    let days = body["analytics"]["data"]["views_by_day"].as_array().unwrap();
    assert_eq!(days[0]["date"], "2024-03-09");
    assert_eq!(days[0]["views"], 1);

    let body: Value = harness
        .server
        .get("/v1/analytics?interval=allTime")
        .add_header("authorization", harness.user_auth_header())
        .await
        .json();

    let days = body["analytics"]["data"]["views_by_day"].as_array().unwrap();
    assert_eq!(days[0]["date"], "2024-03-10");
    assert_eq!(days[0]["views"], 1);
}

#[tokio::test]
async fn analytics_can_be_filtered_by_product() {
    let harness = TestHarness::new().await;
    harness.set_tier(Tier::Basic).await;
    let viewed = harness.create_product("Viewed", "https://one.example.com").await;
    let quiet = harness.create_product("Quiet", "https://two.example.com").await;

    harness
        .store
        .record_product_view(viewed.id, None, Utc::now())
        .await
        .unwrap();

    let total = |body: &Value| -> u64 {
        body["analytics"]["data"]["views_by_day"]
            .as_array()
            .unwrap()
            .iter()
            .map(|d| d["views"].as_u64().unwrap())
            .sum()
    };

    let body: Value = harness
        .server
        .get(&format!("/v1/analytics?interval=last7Days&product_id={}", quiet.id))
        .add_header("authorization", harness.user_auth_header())
        .await
        .json();
    assert_eq!(body["product_id"], quiet.id.to_string());
    assert_eq!(total(&body), 0);

    let body: Value = harness
        .server
        .get("/v1/analytics?interval=last7Days")
        .add_header("authorization", harness.user_auth_header())
        .await
        .json();
    assert_eq!(total(&body), 1);
}
