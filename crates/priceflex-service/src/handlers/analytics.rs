//! View analytics.
//!
//! Charts are bucketed by calendar day in the viewer's timezone. Callers on a
//! tier without analytics get the permission fallback instead of data.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use priceflex_core::{
    can_access_analytics, zero_fill, ChartInterval, CountryGroupViews, CountryViews, DailyViews,
    DayRange, DisplayTimezone, ProductId, ViewFilter,
};
use priceflex_store::Store;

use super::{current_tier, Gated};
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Analytics query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct AnalyticsQuery {
    /// Chart interval (default `last30Days`).
    #[serde(default)]
    pub interval: Option<ChartInterval>,
    /// IANA timezone (default `UTC`).
    #[serde(default)]
    pub timezone: Option<String>,
    /// Restrict to one product.
    #[serde(default)]
    pub product_id: Option<ProductId>,
}

/// Analytics page response.
#[derive(Debug, Serialize)]
pub struct AnalyticsResponse {
    /// The charted interval.
    pub interval: ChartInterval,
    /// The timezone days are bucketed in.
    pub timezone: String,
    /// The product filter, if any.
    pub product_id: Option<ProductId>,
    /// Selectable intervals.
    pub intervals: Vec<IntervalOption>,
    /// The charts, or the permission fallback.
    pub analytics: Gated<AnalyticsCharts>,
}

/// A selectable chart interval.
#[derive(Debug, Serialize)]
pub struct IntervalOption {
    /// Query value.
    pub value: ChartInterval,
    /// Display label.
    pub label: &'static str,
}

/// The three analytics charts.
#[derive(Debug, Serialize)]
pub struct AnalyticsCharts {
    /// Views per day, zero-filled.
    pub views_by_day: Vec<DailyViews>,
    /// Views per country, most viewed first.
    pub views_by_country: Vec<CountryViews>,
    /// Views per PPP group, every group listed.
    pub views_by_country_group: Vec<CountryGroupViews>,
}

/// Get the analytics page.
pub async fn get_analytics(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(query): Query<AnalyticsQuery>,
) -> Result<Json<AnalyticsResponse>, ApiError> {
    let interval = query.interval.unwrap_or_default();
    let timezone = match query.timezone.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => DisplayTimezone::parse(name)?,
        _ => DisplayTimezone::utc(),
    };

    let tier = current_tier(state.store.as_ref(), &auth.user_id).await?;
    let analytics = if can_access_analytics(tier) {
        let filter = ViewFilter::owner(auth.user_id.clone()).with_product(query.product_id);
        Gated::Granted {
            data: charts(state.store.as_ref(), filter, interval, &timezone).await?,
        }
    } else {
        tracing::debug!(user_id = %auth.user_id, tier = %tier, "Analytics not in tier");
        Gated::fallback()
    };

    Ok(Json(AnalyticsResponse {
        interval,
        timezone: timezone.name().to_string(),
        product_id: query.product_id,
        intervals: ChartInterval::ALL
            .into_iter()
            .map(|value| IntervalOption {
                value,
                label: value.label(),
            })
            .collect(),
        analytics,
    }))
}

async fn charts(
    store: &dyn Store,
    filter: ViewFilter,
    interval: ChartInterval,
    timezone: &DisplayTimezone,
) -> Result<AnalyticsCharts, ApiError> {
    let (range, filter) = chart_window(store, filter, interval, timezone).await?;

    Ok(AnalyticsCharts {
        views_by_day: daily_views(store, range, &filter, timezone).await?,
        views_by_country: store.views_by_country(&filter).await?,
        views_by_country_group: store.views_by_country_group(&filter).await?,
    })
}

/// Per-day views over `interval`, one entry per local day, oldest first.
pub(crate) async fn views_by_day(
    store: &dyn Store,
    filter: ViewFilter,
    interval: ChartInterval,
    timezone: &DisplayTimezone,
) -> Result<Vec<DailyViews>, ApiError> {
    let (range, filter) = chart_window(store, filter, interval, timezone).await?;
    daily_views(store, range, &filter, timezone).await
}

async fn daily_views(
    store: &dyn Store,
    range: DayRange,
    filter: &ViewFilter,
    timezone: &DisplayTimezone,
) -> Result<Vec<DailyViews>, ApiError> {
    let counts = store.views_by_local_day(filter, timezone).await?;
    Ok(zero_fill(range, counts))
}

/// The charted days and `filter` bounded to views from the first of them.
///
/// "Today" is the current date in `timezone`. `allTime` starts on the local
/// date of the first recorded view.
async fn chart_window(
    store: &dyn Store,
    filter: ViewFilter,
    interval: ChartInterval,
    timezone: &DisplayTimezone,
) -> Result<(DayRange, ViewFilter), ApiError> {
    let today = timezone.today(Utc::now())?;

    let first_view = match interval.days() {
        Some(_) => None,
        None => match store.first_view_at(&filter).await? {
            Some(at) => Some(timezone.local_date(at)?),
            None => None,
        },
    };

    let range = interval.range(today, first_view);
    let since = timezone.start_of_day(range.start)?;
    Ok((range, filter.since(since)))
}
