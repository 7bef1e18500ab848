//! Public discount banner.
//!
//! Embedding sites request the banner for a product. Every request that
//! resolves to a product is recorded as a view, even when the banner is not
//! shown.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap};
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use priceflex_core::{can_remove_branding, can_show_discount_banner, BannerMessage};
use priceflex_store::BannerTarget;

use super::{current_tier, parse_product_id, start_of_month, to_percent};
use crate::error::ApiError;
use crate::state::AppState;

/// A rendered banner.
#[derive(Debug, Serialize)]
pub struct BannerResponse {
    /// Message with `{country}`, `{coupon}` and `{discount}` substituted.
    pub message: String,
    /// Visitor's country name.
    pub country: String,
    /// Coupon code.
    pub coupon: String,
    /// Whole discount percentage.
    pub discount_percentage: f64,
    /// Optional CSS class prefix.
    pub class_prefix: Option<String>,
    /// CSS background color.
    pub background_color: String,
    /// CSS text color.
    pub text_color: String,
    /// CSS font size.
    pub font_size: String,
    /// CSS selector of the banner container.
    pub banner_container: String,
    /// Whether the banner is sticky.
    pub is_sticky: bool,
    /// Whether the PriceFlex branding is shown.
    pub show_branding: bool,
}

/// Get the discount banner for a product.
pub async fn get_banner(
    State(state): State<Arc<AppState>>,
    Path(product_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<BannerResponse>, ApiError> {
    let not_found = || ApiError::NotFound("banner not available".into());

    let product_id = parse_product_id(&product_id)?;
    let url = header_value(&headers, header::REFERER.as_str())
        .or_else(|| header_value(&headers, header::ORIGIN.as_str()))
        .ok_or_else(not_found)?;
    let country_code = state
        .config
        .test_country_code
        .clone()
        .or_else(|| header_value(&headers, &state.config.country_header));

    let Some(target) = state
        .store
        .get_banner_target(product_id, &url, country_code.as_deref())
        .await?
    else {
        tracing::debug!(product_id = %product_id, url = %url, "No banner target");
        return Err(not_found());
    };

    let owner = &target.product.owner;
    let tier = current_tier(state.store.as_ref(), owner).await?;
    let visits = state
        .store
        .count_views_since(owner, start_of_month(Utc::now())?)
        .await?;
    let can_show = can_show_discount_banner(tier, visits);

    state
        .store
        .record_product_view(
            product_id,
            target.country.as_ref().map(|c| c.id),
            Utc::now(),
        )
        .await?;

    if !can_show {
        tracing::info!(
            product_id = %product_id,
            user_id = %owner,
            visits,
            "Banner visit quota reached"
        );
        return Err(not_found());
    }

    render(target, can_remove_branding(tier)).ok_or_else(not_found).map(Json)
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}

/// Render the banner, or `None` without a resolved country and discount.
fn render(target: BannerTarget, can_remove_branding: bool) -> Option<BannerResponse> {
    let country = target.country?;
    let discount = target.discount?;
    let customization = target.customization;

    let message = customization.render_message(&BannerMessage {
        country: &country.name,
        coupon: &discount.coupon,
        discount_fraction: discount.discount_percentage,
    });

    Some(BannerResponse {
        message,
        country: country.name,
        coupon: discount.coupon,
        discount_percentage: to_percent(discount.discount_percentage),
        class_prefix: customization.class_prefix,
        background_color: customization.background_color,
        text_color: customization.text_color,
        font_size: customization.font_size,
        banner_container: customization.banner_container,
        is_sticky: customization.is_sticky,
        show_branding: !can_remove_branding,
    })
}
