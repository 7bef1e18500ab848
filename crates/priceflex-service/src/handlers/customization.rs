//! Banner customization handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use priceflex_core::{can_customize_banner, CustomizationUpdate, Permission, ProductCustomization};

use super::{current_tier, parse_product_id};
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Customization response.
#[derive(Debug, Serialize)]
pub struct CustomizationResponse {
    /// The current customization.
    pub customization: ProductCustomization,
    /// Whether the caller's tier may change it.
    pub can_customize_banner: bool,
}

/// Get a product's banner customization.
pub async fn get_customization(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(product_id): Path<String>,
) -> Result<Json<CustomizationResponse>, ApiError> {
    let product_id = parse_product_id(&product_id)?;
    let customization = state
        .store
        .get_product_customization(product_id, &auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("product not found: {product_id}")))?;

    let tier = current_tier(state.store.as_ref(), &auth.user_id).await?;

    Ok(Json(CustomizationResponse {
        customization,
        can_customize_banner: can_customize_banner(tier),
    }))
}

/// Replace a product's banner customization.
pub async fn update_customization(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(product_id): Path<String>,
    Json(body): Json<CustomizationUpdate>,
) -> Result<Json<CustomizationResponse>, ApiError> {
    let product_id = parse_product_id(&product_id)?;

    let tier = current_tier(state.store.as_ref(), &auth.user_id).await?;
    if !can_customize_banner(tier) {
        return Err(ApiError::Forbidden(format!(
            "The {tier} plan cannot customize the banner; upgrade to {}",
            Permission::CustomizeBanner.minimum_tier()
        )));
    }

    let update = body.validate()?;
    if !state
        .store
        .update_product_customization(product_id, &auth.user_id, &update)
        .await?
    {
        return Err(ApiError::NotFound(format!("product not found: {product_id}")));
    }

    tracing::info!(user_id = %auth.user_id, product_id = %product_id, "Banner customized");

    let customization = state
        .store
        .get_product_customization(product_id, &auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("product not found: {product_id}")))?;

    Ok(Json(CustomizationResponse {
        customization,
        can_customize_banner: true,
    }))
}
