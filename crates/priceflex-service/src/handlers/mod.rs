//! API handlers.

pub mod analytics;
pub mod banner;
pub mod customization;
pub mod dashboard;
pub mod discounts;
pub mod health;
pub mod marketing;
pub mod products;
pub mod subscription;
pub mod webhooks;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::Serialize;

use priceflex_core::permissions::{FALLBACK_MESSAGE, FALLBACK_TITLE};
use priceflex_core::{ProductId, Tier, UserId};
use priceflex_store::Store;

use crate::error::ApiError;

/// A view that renders its content only when the caller's tier allows it.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Gated<T> {
    /// The caller may see the content.
    Granted {
        /// The gated content.
        data: T,
    },
    /// The caller's tier lacks the capability.
    Fallback {
        /// Fallback title.
        title: &'static str,
        /// Fallback message.
        message: &'static str,
    },
}

impl<T> Gated<T> {
    /// The permission fallback.
    #[must_use]
    pub fn fallback() -> Self {
        Self::Fallback {
            title: FALLBACK_TITLE,
            message: FALLBACK_MESSAGE,
        }
    }
}

/// The caller's current tier; users without a subscription row are on Free.
pub(crate) async fn current_tier(store: &dyn Store, user_id: &UserId) -> Result<Tier, ApiError> {
    Ok(store
        .get_user_subscription(user_id)
        .await?
        .map_or(Tier::Free, |sub| sub.tier))
}

/// Midnight UTC on the first day of `now`'s month.
pub(crate) fn start_of_month(now: DateTime<Utc>) -> Result<DateTime<Utc>, ApiError> {
    NaiveDate::from_ymd_opt(now.year(), now.month(), 1)
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .map(|start| start.and_utc())
        .ok_or_else(|| ApiError::Internal(format!("no month start for {now}")))
}

/// Parse a product ID from a path segment.
pub(crate) fn parse_product_id(raw: &str) -> Result<ProductId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::NotFound(format!("product not found: {raw}")))
}

/// Whole percentage for display: `0.2` becomes `20`, `0.125` becomes `12.5`.
pub(crate) fn to_percent(fraction: f64) -> f64 {
    (fraction * 10_000.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_starts_at_utc_midnight_on_the_first() {
        let now = "2024-03-17T22:15:00Z".parse::<DateTime<Utc>>().unwrap();
        assert_eq!(
            start_of_month(now).unwrap(),
            "2024-03-01T00:00:00Z".parse::<DateTime<Utc>>().unwrap()
        );
    }

    #[test]
    fn percentages_round_to_two_decimals() {
        assert!((to_percent(0.2) - 20.0).abs() < f64::EPSILON);
        assert!((to_percent(0.125) - 12.5).abs() < f64::EPSILON);
        assert!((to_percent(0.35) - 35.0).abs() < f64::EPSILON);
    }

    #[test]
    fn fallback_serializes_with_status_tag() {
        let view: Gated<u32> = Gated::fallback();
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["status"], "fallback");
        assert_eq!(json["title"], "Permission Denied");

        let granted = serde_json::to_value(Gated::Granted { data: 7 }).unwrap();
        assert_eq!(granted["status"], "granted");
        assert_eq!(granted["data"], 7);
    }
}
