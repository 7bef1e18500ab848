//! Dashboard home.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use priceflex_core::{
    can_access_analytics, ChartInterval, DailyViews, DisplayTimezone, Product, ViewFilter,
};

use super::analytics::views_by_day;
use super::{current_tier, Gated};
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Products shown on the dashboard.
const DASHBOARD_PRODUCT_LIMIT: usize = 6;

/// The dashboard: either the empty state or the product grid with a chart.
#[derive(Debug, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum DashboardView {
    /// The user has no products yet.
    Empty {
        /// Heading.
        title: &'static str,
        /// Call to action.
        message: &'static str,
        /// Where new products are created.
        new_product_url: &'static str,
    },
    /// The user's newest products and the last 30 days of views.
    Products {
        /// Up to six products, newest first.
        products: Vec<Product>,
        /// Views per UTC day over the last 30 days, or the fallback.
        analytics: Gated<Vec<DailyViews>>,
    },
}

/// Get the dashboard.
pub async fn get_dashboard(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<DashboardView>, ApiError> {
    let products = state
        .store
        .get_products(&auth.user_id, Some(DASHBOARD_PRODUCT_LIMIT))
        .await?;

    if products.is_empty() {
        return Ok(Json(DashboardView::Empty {
            title: "You have no products",
            message: "Get started with PPP discounts by creating a product",
            new_product_url: "/dashboard/products/new",
        }));
    }

    let tier = current_tier(state.store.as_ref(), &auth.user_id).await?;
    let analytics = if can_access_analytics(tier) {
        Gated::Granted {
            data: views_by_day(
                state.store.as_ref(),
                ViewFilter::owner(auth.user_id.clone()),
                ChartInterval::Last30Days,
                &DisplayTimezone::utc(),
            )
            .await?,
        }
    } else {
        Gated::fallback()
    };

    Ok(Json(DashboardView::Products {
        products,
        analytics,
    }))
}
