//! Webhook handlers for Clerk and Stripe.

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use priceflex_core::{BillingUpdate, NewUserSubscription, Tier, UserId};

use crate::clerk::{self, SvixHeaders};
use crate::error::ApiError;
use crate::state::AppState;
use crate::stripe::{self, Subscription};

/// Webhook response.
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    /// Whether the webhook was processed.
    pub received: bool,
}

fn header<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<&'a str, ApiError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::BadRequest(format!("Missing {name} header")))
}

fn secret<'a>(secret: Option<&'a String>, provider: &str) -> Result<&'a str, ApiError> {
    secret
        .map(String::as_str)
        .ok_or_else(|| ApiError::Internal(format!("{provider} webhook secret not configured")))
}

/// Handle Clerk user lifecycle webhooks.
pub async fn clerk_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<WebhookResponse>, ApiError> {
    let webhook_secret = secret(state.config.clerk_webhook_secret.as_ref(), "Clerk")?;

    let svix = SvixHeaders {
        id: header(&headers, clerk::ID_HEADER)?,
        timestamp: header(&headers, clerk::TIMESTAMP_HEADER)?,
        signature: header(&headers, clerk::SIGNATURE_HEADER)?,
    };
    clerk::verify_signature(&body, svix, webhook_secret, Utc::now().timestamp()).map_err(|e| {
        tracing::warn!(error = %e, "Invalid Clerk webhook signature");
        ApiError::BadRequest("Invalid webhook signature".into())
    })?;

    let event: clerk::Event =
        serde_json::from_str(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    tracing::info!(event_type = %event.event_type, svix_id = %svix.id, "Received Clerk webhook");

    match event.event_type.as_str() {
        "user.created" => {
            let user_id = event_user(&event)?;
            let created = state
                .store
                .create_user_subscription(&NewUserSubscription {
                    user_id: user_id.clone(),
                    tier: Tier::Free,
                })
                .await?;
            tracing::info!(user_id = %user_id, created, "User subscription ensured");
        }
        "user.deleted" => {
            let user_id = event_user(&event)?;
            let deleted = state.store.delete_user(&user_id).await?;
            tracing::info!(
                user_id = %user_id,
                subscriptions = deleted.subscriptions,
                products = deleted.products,
                "User deleted"
            );
        }
        _ => {
            tracing::debug!(event_type = %event.event_type, "Unhandled Clerk event");
        }
    }

    Ok(Json(WebhookResponse { received: true }))
}

fn event_user(event: &clerk::Event) -> Result<UserId, ApiError> {
    event
        .data
        .id
        .as_deref()
        .ok_or_else(|| ApiError::BadRequest("Missing user id".into()))?
        .parse()
        .map_err(|e: priceflex_core::IdError| ApiError::BadRequest(e.to_string()))
}

/// Handle Stripe subscription webhooks.
pub async fn stripe_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<WebhookResponse>, ApiError> {
    let webhook_secret = secret(state.config.stripe_webhook_secret.as_ref(), "Stripe")?;
    let signature = header(&headers, stripe::SIGNATURE_HEADER)?;

    stripe::verify_signature(&body, signature, webhook_secret, Utc::now().timestamp()).map_err(
        |e| {
            tracing::warn!(error = %e, "Invalid Stripe webhook signature");
            ApiError::BadRequest("Invalid webhook signature".into())
        },
    )?;

    let event: stripe::Event =
        serde_json::from_str(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    tracing::info!(
        event_type = %event.event_type,
        event_id = %event.id,
        "Received Stripe webhook"
    );

    match event.event_type.as_str() {
        "customer.subscription.created" => {
            handle_subscription_created(&state, &subscription(&event)?).await?;
        }
        "customer.subscription.updated" => {
            handle_subscription_updated(&state, &subscription(&event)?).await?;
        }
        "customer.subscription.deleted" => {
            handle_subscription_deleted(&state, &subscription(&event)?).await?;
        }
        _ => {
            tracing::debug!(event_type = %event.event_type, "Unhandled Stripe event");
        }
    }

    Ok(Json(WebhookResponse { received: true }))
}

fn subscription(event: &stripe::Event) -> Result<Subscription, ApiError> {
    serde_json::from_value(event.data.object.clone())
        .map_err(|e| ApiError::BadRequest(format!("Invalid subscription object: {e}")))
}

/// The tier of the subscription's first price.
fn subscription_tier(state: &AppState, sub: &Subscription) -> Result<Tier, ApiError> {
    let price_id = sub
        .first_item()
        .map(|item| item.price.id.as_str())
        .ok_or_else(|| ApiError::BadRequest("Subscription has no items".into()))?;

    state
        .config
        .stripe_price_ids
        .tier_for(price_id)
        .ok_or_else(|| ApiError::BadRequest(format!("Unknown price: {price_id}")))
}

async fn handle_subscription_created(state: &AppState, sub: &Subscription) -> Result<(), ApiError> {
    let tier = subscription_tier(state, sub)?;
    let user_id: UserId = sub
        .clerk_user_id()
        .ok_or_else(|| ApiError::BadRequest("Missing clerkUserId metadata".into()))?
        .parse()
        .map_err(|e: priceflex_core::IdError| ApiError::BadRequest(e.to_string()))?;

    let update = BillingUpdate {
        tier: Some(tier),
        stripe_customer_id: Some(Some(sub.customer.clone())),
        stripe_subscription_id: Some(Some(sub.id.clone())),
        stripe_subscription_item_id: Some(sub.first_item().map(|item| item.id.clone())),
    };

    let updated = state
        .store
        .update_subscription_by_user(&user_id, &update)
        .await?;
    if !updated {
        tracing::warn!(user_id = %user_id, "No subscription row for Stripe subscription");
    }
    tracing::info!(
        user_id = %user_id,
        tier = %tier,
        subscription_id = %sub.id,
        "Subscription created"
    );
    Ok(())
}

async fn handle_subscription_updated(state: &AppState, sub: &Subscription) -> Result<(), ApiError> {
    let tier = subscription_tier(state, sub)?;
    let update = BillingUpdate {
        tier: Some(tier),
        ..BillingUpdate::default()
    };

    let updated = state
        .store
        .update_subscription_by_customer(&sub.customer, &update)
        .await?;
    if !updated {
        tracing::warn!(customer_id = %sub.customer, "No subscription for Stripe customer");
    }
    tracing::info!(customer_id = %sub.customer, tier = %tier, "Subscription updated");
    Ok(())
}

async fn handle_subscription_deleted(state: &AppState, sub: &Subscription) -> Result<(), ApiError> {
    let update = BillingUpdate {
        tier: Some(Tier::Free),
        stripe_customer_id: None,
        stripe_subscription_id: Some(None),
        stripe_subscription_item_id: Some(None),
    };

    let updated = state
        .store
        .update_subscription_by_customer(&sub.customer, &update)
        .await?;
    if !updated {
        tracing::warn!(customer_id = %sub.customer, "No subscription for Stripe customer");
    }
    tracing::info!(customer_id = %sub.customer, "Subscription cancelled");
    Ok(())
}
