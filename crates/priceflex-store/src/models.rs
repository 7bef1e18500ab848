//! Database row models.
//!
//! These types map directly to PostgreSQL rows using sqlx's `FromRow` derive
//! and are converted into core domain types at the crate boundary.

#![allow(missing_docs)]

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use priceflex_core::{
    Country, CountryGroup, CountryGroupDiscount, CountryGroupViews, CountryViews, GroupDiscount,
    Product, ProductCustomization, ProductView, UserSubscription,
};

use crate::error::{Result, StoreError};

/// Product row from the database.
#[derive(Debug, Clone, FromRow)]
pub struct ProductRow {
    pub id: Uuid,
    pub clerk_user_id: String,
    pub name: String,
    pub url: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = StoreError;

    fn try_from(row: ProductRow) -> Result<Self> {
        Ok(Self {
            id: row.id.into(),
            owner: row.clerk_user_id.parse().map_err(invalid)?,
            name: row.name,
            url: row.url,
            description: row.description,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Product customization row from the database.
#[derive(Debug, Clone, FromRow)]
pub struct CustomizationRow {
    pub product_id: Uuid,
    pub class_prefix: Option<String>,
    pub location_message: String,
    pub background_color: String,
    pub text_color: String,
    pub font_size: String,
    pub banner_container: String,
    pub is_sticky: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CustomizationRow> for ProductCustomization {
    fn from(row: CustomizationRow) -> Self {
        Self {
            product_id: row.product_id.into(),
            class_prefix: row.class_prefix,
            location_message: row.location_message,
            background_color: row.background_color,
            text_color: row.text_color,
            font_size: row.font_size,
            banner_container: row.banner_container,
            is_sticky: row.is_sticky,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// User subscription row from the database. `tier` is selected as text.
#[derive(Debug, Clone, FromRow)]
pub struct SubscriptionRow {
    pub id: Uuid,
    pub clerk_user_id: String,
    pub stripe_subscription_item_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
    pub tier: String,
    pub stripe_customer_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionRow> for UserSubscription {
    type Error = StoreError;

    fn try_from(row: SubscriptionRow) -> Result<Self> {
        Ok(Self {
            id: row.id.into(),
            user_id: row.clerk_user_id.parse().map_err(invalid)?,
            stripe_subscription_item_id: row.stripe_subscription_item_id,
            stripe_subscription_id: row.stripe_subscription_id,
            tier: row.tier.parse()?,
            stripe_customer_id: row.stripe_customer_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Country group row from the database.
#[derive(Debug, Clone, FromRow)]
pub struct CountryGroupRow {
    pub id: Uuid,
    pub name: String,
    pub recommended_discount_percentage: Option<f32>,
}

impl From<CountryGroupRow> for CountryGroup {
    fn from(row: CountryGroupRow) -> Self {
        Self {
            id: row.id.into(),
            name: row.name,
            recommended_discount_percentage: row.recommended_discount_percentage.map(widen),
        }
    }
}

/// Country row from the database.
#[derive(Debug, Clone, FromRow)]
pub struct CountryRow {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub country_group_id: Uuid,
}

impl From<CountryRow> for Country {
    fn from(row: CountryRow) -> Self {
        Self {
            id: row.id.into(),
            name: row.name,
            code: row.code,
            country_group_id: row.country_group_id.into(),
        }
    }
}

/// Country group discount row. `dicount_percentage` is aliased to
/// `discount_percentage` in queries.
#[derive(Debug, Clone, FromRow)]
pub struct DiscountRow {
    pub country_group_id: Uuid,
    pub product_id: Uuid,
    pub coupon: String,
    pub discount_percentage: f32,
}

impl From<DiscountRow> for CountryGroupDiscount {
    fn from(row: DiscountRow) -> Self {
        Self {
            country_group_id: row.country_group_id.into(),
            product_id: row.product_id.into(),
            coupon: row.coupon,
            discount_percentage: widen(row.discount_percentage),
        }
    }
}

impl From<DiscountRow> for GroupDiscount {
    fn from(row: DiscountRow) -> Self {
        Self {
            coupon: row.coupon,
            discount_percentage: widen(row.discount_percentage),
        }
    }
}

/// Product view row from the database.
#[derive(Debug, Clone, FromRow)]
pub struct ProductViewRow {
    pub id: Uuid,
    pub product_id: Uuid,
    pub country_id: Option<Uuid>,
    pub visited_at: DateTime<Utc>,
}

impl From<ProductViewRow> for ProductView {
    fn from(row: ProductViewRow) -> Self {
        Self {
            id: row.id.into(),
            product_id: row.product_id.into(),
            country_id: row.country_id.map(Into::into),
            visited_at: row.visited_at,
        }
    }
}

/// Views on one local day.
#[derive(Debug, Clone, FromRow)]
pub struct DailyCountRow {
    pub day: NaiveDate,
    pub views: i64,
}

/// Views from one country.
#[derive(Debug, Clone, FromRow)]
pub struct CountryViewsRow {
    pub country_code: String,
    pub country_name: String,
    pub views: i64,
}

impl From<CountryViewsRow> for CountryViews {
    fn from(row: CountryViewsRow) -> Self {
        Self {
            country_code: row.country_code,
            country_name: row.country_name,
            views: count(row.views),
        }
    }
}

/// Views from one country group.
#[derive(Debug, Clone, FromRow)]
pub struct CountryGroupViewsRow {
    pub country_group_name: String,
    pub views: i64,
}

impl From<CountryGroupViewsRow> for CountryGroupViews {
    fn from(row: CountryGroupViewsRow) -> Self {
        Self {
            country_group_name: row.country_group_name,
            views: count(row.views),
        }
    }
}

/// Convert a SQL `COUNT(*)` to an unsigned count.
pub(crate) fn count(value: i64) -> u64 {
    u64::try_from(value).unwrap_or_default()
}

/// Widen a `real` column to `f64` without exposing float noise (`0.2f32` stays `0.2`).
pub(crate) fn widen(value: f32) -> f64 {
    value.to_string().parse().unwrap_or_else(|_| f64::from(value))
}

/// Narrow a fraction for a `real` column.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn narrow(value: f64) -> f32 {
    value as f32
}

fn invalid(err: impl std::fmt::Display) -> StoreError {
    StoreError::Serialization(err.to_string())
}
