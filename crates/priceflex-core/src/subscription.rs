//! User subscription records.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::ids::{SubscriptionId, UserId};
use crate::tier::Tier;

/// The billing-tier record of one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSubscription {
    /// Row ID.
    pub id: SubscriptionId,
    /// The owning user. Unique.
    pub user_id: UserId,
    /// Stripe subscription item ID.
    pub stripe_subscription_item_id: Option<String>,
    /// Stripe subscription ID.
    pub stripe_subscription_id: Option<String>,
    /// Current tier.
    pub tier: Tier,
    /// Stripe customer ID.
    pub stripe_customer_id: Option<String>,
    /// When the row was created.
    pub created_at: DateTime<Utc>,
    /// When the row was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a subscription at signup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUserSubscription {
    /// The owning user.
    pub user_id: UserId,
    /// Initial tier (normally `Free`).
    pub tier: Tier,
}

/// Fields written by billing-provider events.
///
/// `None` leaves a column untouched; `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[allow(clippy::option_option)]
pub struct BillingUpdate {
    /// New tier.
    pub tier: Option<Tier>,
    /// New Stripe customer ID.
    pub stripe_customer_id: Option<Option<String>>,
    /// New Stripe subscription ID.
    pub stripe_subscription_id: Option<Option<String>>,
    /// New Stripe subscription item ID.
    pub stripe_subscription_item_id: Option<Option<String>>,
}

impl BillingUpdate {
    /// Apply the update to a subscription in place.
    pub fn apply(&self, subscription: &mut UserSubscription, now: DateTime<Utc>) {
        if let Some(tier) = self.tier {
            subscription.tier = tier;
        }
        if let Some(customer) = &self.stripe_customer_id {
            subscription.stripe_customer_id.clone_from(customer);
        }
        if let Some(sub) = &self.stripe_subscription_id {
            subscription.stripe_subscription_id.clone_from(sub);
        }
        if let Some(item) = &self.stripe_subscription_item_id {
            subscription.stripe_subscription_item_id.clone_from(item);
        }
        subscription.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subscription() -> UserSubscription {
        let now = Utc::now();
        UserSubscription {
            id: SubscriptionId::generate(),
            user_id: "user_1".parse().unwrap(),
            stripe_subscription_item_id: Some("si_1".into()),
            stripe_subscription_id: Some("sub_1".into()),
            tier: Tier::Standard,
            stripe_customer_id: Some("cus_1".into()),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn apply_distinguishes_untouched_from_cleared() {
        let mut sub = subscription();
        let update = BillingUpdate {
            tier: Some(Tier::Free),
            stripe_subscription_id: Some(None),
            stripe_subscription_item_id: Some(None),
            ..BillingUpdate::default()
        };
        update.apply(&mut sub, Utc::now());

        assert_eq!(sub.tier, Tier::Free);
        assert_eq!(sub.stripe_subscription_id, None);
        assert_eq!(sub.stripe_subscription_item_id, None);
        assert_eq!(sub.stripe_customer_id.as_deref(), Some("cus_1"));
    }
}
