//! Capability checks evaluated against a subscription tier.
//!
//! Callers that render a view treat a denied capability as "show the fallback",
//! never as an error. Callers that mutate reject the request instead.

use serde::Serialize;

use crate::tier::Tier;

/// Title shown when a gated view falls back.
pub const FALLBACK_TITLE: &str = "Permission Denied";

/// Message shown when a gated view falls back.
pub const FALLBACK_MESSAGE: &str =
    "You do not have permission to perform this action. Try upgrading your account to access this feature.";

/// Capabilities that depend only on the tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// View analytics charts.
    AccessAnalytics,
    /// Change banner colors, font and message.
    CustomizeBanner,
    /// Hide the PriceFlex branding under the banner.
    RemoveBranding,
}

impl Permission {
    /// Whether `tier` grants this permission.
    #[must_use]
    pub const fn is_granted(self, tier: Tier) -> bool {
        let limits = tier.limits();
        match self {
            Self::AccessAnalytics => limits.can_access_analytics,
            Self::CustomizeBanner => limits.can_customize_banner,
            Self::RemoveBranding => limits.can_remove_branding,
        }
    }

    /// The cheapest tier that grants this permission.
    #[must_use]
    pub fn minimum_tier(self) -> Tier {
        Tier::IN_ORDER
            .into_iter()
            .find(|tier| self.is_granted(*tier))
            .unwrap_or(Tier::Premium)
    }
}

/// Whether the analytics views are available.
#[must_use]
pub const fn can_access_analytics(tier: Tier) -> bool {
    Permission::AccessAnalytics.is_granted(tier)
}

/// Whether the banner style can be customized.
#[must_use]
pub const fn can_customize_banner(tier: Tier) -> bool {
    Permission::CustomizeBanner.is_granted(tier)
}

/// Whether the PriceFlex branding can be hidden.
#[must_use]
pub const fn can_remove_branding(tier: Tier) -> bool {
    Permission::RemoveBranding.is_granted(tier)
}

/// Whether another product may be created given the current product count.
#[must_use]
pub const fn can_create_product(tier: Tier, existing_products: u64) -> bool {
    existing_products < tier.limits().max_number_of_products as u64
}

/// Whether the banner may still be shown given this month's visit count.
#[must_use]
pub const fn can_show_discount_banner(tier: Tier, visits_this_month: u64) -> bool {
    visits_this_month < tier.limits().max_number_of_visits
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analytics_requires_paid_tier() {
        assert!(!can_access_analytics(Tier::Free));
        assert!(can_access_analytics(Tier::Basic));
        assert!(can_access_analytics(Tier::Premium));
    }

    #[test]
    fn customization_starts_at_standard() {
        assert!(!can_customize_banner(Tier::Basic));
        assert!(can_customize_banner(Tier::Standard));
        assert_eq!(Permission::CustomizeBanner.minimum_tier(), Tier::Standard);
        assert_eq!(Permission::RemoveBranding.minimum_tier(), Tier::Basic);
    }

    #[test]
    fn product_limit_is_exclusive() {
        assert!(can_create_product(Tier::Free, 0));
        assert!(!can_create_product(Tier::Free, 1));
        assert!(can_create_product(Tier::Basic, 4));
        assert!(!can_create_product(Tier::Basic, 5));
    }

    #[test]
    fn visit_quota_is_exclusive() {
        assert!(can_show_discount_banner(Tier::Free, 4_999));
        assert!(!can_show_discount_banner(Tier::Free, 5_000));
        assert!(can_show_discount_banner(Tier::Premium, 999_999));
    }
}
