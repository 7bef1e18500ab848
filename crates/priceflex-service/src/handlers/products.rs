//! Product management handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use priceflex_core::{Product, ProductDetails};

use super::{current_tier, parse_product_id};
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// List the caller's products, newest first.
pub async fn list_products(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<Vec<Product>>, ApiError> {
    Ok(Json(state.store.get_products(&auth.user_id, None).await?))
}

/// Create a product with the default banner customization.
pub async fn create_product(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<ProductDetails>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    let details = body.validate()?;

    let tier = current_tier(state.store.as_ref(), &auth.user_id).await?;
    let max_products = u64::from(tier.limits().max_number_of_products);

    let product = state
        .store
        .create_product_within_limit(&auth.user_id, &details, max_products)
        .await?
        .ok_or_else(|| {
            ApiError::Forbidden(format!("The {tier} plan allows {max_products} product(s)"))
        })?;

    tracing::info!(
        user_id = %auth.user_id,
        product_id = %product.id,
        "Product created"
    );

    Ok((StatusCode::CREATED, Json(product)))
}

/// Get one of the caller's products.
pub async fn get_product(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(product_id): Path<String>,
) -> Result<Json<Product>, ApiError> {
    let product_id = parse_product_id(&product_id)?;
    state
        .store
        .get_product(product_id, &auth.user_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("product not found: {product_id}")))
}

/// Replace a product's details.
pub async fn update_product(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(product_id): Path<String>,
    Json(body): Json<ProductDetails>,
) -> Result<Json<Product>, ApiError> {
    let product_id = parse_product_id(&product_id)?;
    let details = body.validate()?;

    if !state
        .store
        .update_product(product_id, &auth.user_id, &details)
        .await?
    {
        return Err(ApiError::NotFound(format!("product not found: {product_id}")));
    }

    tracing::info!(user_id = %auth.user_id, product_id = %product_id, "Product updated");

    state
        .store
        .get_product(product_id, &auth.user_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("product not found: {product_id}")))
}

/// Delete a product with its customization, discounts and views.
pub async fn delete_product(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(product_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let product_id = parse_product_id(&product_id)?;

    if !state.store.delete_product(product_id, &auth.user_id).await? {
        return Err(ApiError::NotFound(format!("product not found: {product_id}")));
    }

    tracing::info!(user_id = %auth.user_id, product_id = %product_id, "Product deleted");

    Ok(StatusCode::NO_CONTENT)
}
