//! Per-country-group discount handlers.
//!
//! Percentages cross the API as whole numbers (`20` for 20%) and are stored
//! as fractions.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use priceflex_core::{
    CountryGroupId, CountryGroupWithDiscount, DiscountChanges, DiscountEntry, ProductId, UserId,
};
use priceflex_store::Store;

use super::{parse_product_id, to_percent};
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// A country group as shown in the discount form.
#[derive(Debug, Serialize)]
pub struct CountryGroupResponse {
    /// Group ID.
    pub id: CountryGroupId,
    /// Group name.
    pub name: String,
    /// Suggested whole percentage.
    pub recommended_discount_percentage: Option<f64>,
    /// Countries in the group.
    pub countries: Vec<CountryResponse>,
    /// The product's discount for the group.
    pub discount: Option<DiscountResponse>,
}

/// A country in a group.
#[derive(Debug, Serialize)]
pub struct CountryResponse {
    /// Display name.
    pub name: String,
    /// ISO code.
    pub code: String,
}

/// A configured discount.
#[derive(Debug, Serialize)]
pub struct DiscountResponse {
    /// Coupon code.
    pub coupon: String,
    /// Whole percentage.
    pub discount_percentage: f64,
}

impl From<CountryGroupWithDiscount> for CountryGroupResponse {
    fn from(group: CountryGroupWithDiscount) -> Self {
        Self {
            id: group.group.id,
            name: group.group.name,
            recommended_discount_percentage: group
                .group
                .recommended_discount_percentage
                .map(to_percent),
            countries: group
                .countries
                .into_iter()
                .map(|c| CountryResponse {
                    name: c.name,
                    code: c.code,
                })
                .collect(),
            discount: group.discount.map(|d| DiscountResponse {
                coupon: d.coupon,
                discount_percentage: to_percent(d.discount_percentage),
            }),
        }
    }
}

/// Discount form submission.
#[derive(Debug, Deserialize)]
pub struct UpdateDiscountsRequest {
    /// One entry per edited group.
    pub groups: Vec<DiscountEntry>,
}

/// List the country groups with the product's discounts.
pub async fn get_country_discounts(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(product_id): Path<String>,
) -> Result<Json<Vec<CountryGroupResponse>>, ApiError> {
    let product_id = parse_product_id(&product_id)?;
    Ok(Json(
        owned_groups(state.store.as_ref(), product_id, &auth.user_id).await?,
    ))
}

/// Apply the discount form: blank entries clear, filled entries set.
pub async fn update_country_discounts(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(product_id): Path<String>,
    Json(body): Json<UpdateDiscountsRequest>,
) -> Result<Json<Vec<CountryGroupResponse>>, ApiError> {
    let product_id = parse_product_id(&product_id)?;
    let changes = DiscountChanges::from_entries(product_id, body.groups)?;

    if !state
        .store
        .update_country_discounts(product_id, &auth.user_id, &changes)
        .await?
    {
        return Err(ApiError::NotFound(format!("product not found: {product_id}")));
    }

    tracing::info!(
        user_id = %auth.user_id,
        product_id = %product_id,
        deleted = changes.delete.len(),
        upserted = changes.upsert.len(),
        "Country discounts updated"
    );

    Ok(Json(
        owned_groups(state.store.as_ref(), product_id, &auth.user_id).await?,
    ))
}

async fn owned_groups(
    store: &dyn Store,
    product_id: ProductId,
    user_id: &UserId,
) -> Result<Vec<CountryGroupResponse>, ApiError> {
    if store.get_product(product_id, user_id).await?.is_none() {
        return Err(ApiError::NotFound(format!("product not found: {product_id}")));
    }

    Ok(store
        .get_country_groups(product_id, user_id)
        .await?
        .into_iter()
        .map(CountryGroupResponse::from)
        .collect())
}
