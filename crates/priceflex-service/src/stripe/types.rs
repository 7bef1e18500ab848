//! Stripe webhook payload types.

use std::collections::HashMap;

use serde::Deserialize;

/// Stripe event envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    /// Event ID.
    pub id: String,
    /// Event type, e.g. `customer.subscription.updated`.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Event data.
    pub data: EventData,
}

/// Stripe event data container.
#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    /// The object the event is about.
    pub object: serde_json::Value,
}

/// Stripe subscription object.
#[derive(Debug, Clone, Deserialize)]
pub struct Subscription {
    /// Subscription ID.
    pub id: String,
    /// Customer ID.
    pub customer: String,
    /// Metadata attached at checkout; carries `clerkUserId`.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    /// Subscription items.
    pub items: SubscriptionItems,
}

impl Subscription {
    /// The first subscription item, which carries the plan price.
    #[must_use]
    pub fn first_item(&self) -> Option<&SubscriptionItem> {
        self.items.data.first()
    }

    /// The Clerk user the subscription was created for.
    #[must_use]
    pub fn clerk_user_id(&self) -> Option<&str> {
        self.metadata.get("clerkUserId").map(String::as_str)
    }
}

/// List of subscription items.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionItems {
    /// The items.
    #[serde(default)]
    pub data: Vec<SubscriptionItem>,
}

/// Stripe subscription item.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionItem {
    /// Subscription item ID.
    pub id: String,
    /// The item's price.
    pub price: Price,
}

/// Stripe price object.
#[derive(Debug, Clone, Deserialize)]
pub struct Price {
    /// Price ID.
    pub id: String,
}
