//! Current subscription and usage.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use priceflex_core::{can_create_product, can_show_discount_banner, Tier, TierLimits};

use super::{current_tier, start_of_month};
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Subscription response.
#[derive(Debug, Serialize)]
pub struct SubscriptionResponse {
    /// Current tier.
    pub tier: Tier,
    /// Limits of the current tier.
    pub limits: TierLimits,
    /// Products the user owns.
    pub product_count: u64,
    /// Banner visits since the start of the UTC month.
    pub visits_this_month: u64,
    /// Whether another product may be created.
    pub can_create_product: bool,
    /// Whether banners are still shown this month.
    pub can_show_discount_banner: bool,
}

/// Get the current subscription with usage.
pub async fn get_subscription(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<SubscriptionResponse>, ApiError> {
    let tier = current_tier(state.store.as_ref(), &auth.user_id).await?;
    let product_count = state.store.count_products(&auth.user_id).await?;
    let visits_this_month = state
        .store
        .count_views_since(&auth.user_id, start_of_month(Utc::now())?)
        .await?;

    Ok(Json(SubscriptionResponse {
        tier,
        limits: *tier.limits(),
        product_count,
        visits_this_month,
        can_create_product: can_create_product(tier, product_count),
        can_show_discount_banner: can_show_discount_banner(tier, visits_this_month),
    }))
}
