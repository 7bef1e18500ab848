//! Subscription tiers and their limits.
//!
//! Tier names double as the values of the PostgreSQL `tier` enum, so the
//! serialized form is the capitalized name (`"Free"`, `"Basic"`, ...).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ============================================================================
// Limits
// ============================================================================

/// Feature limits and pricing attached to a tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TierLimits {
    /// Display name of the tier.
    pub name: &'static str,
    /// Monthly price in euro cents.
    pub price_in_cents: u32,
    /// Maximum number of products the owner may list.
    pub max_number_of_products: u32,
    /// Maximum banner visits per calendar month.
    pub max_number_of_visits: u64,
    /// Whether the analytics views are available.
    pub can_access_analytics: bool,
    /// Whether the banner style can be customized.
    pub can_customize_banner: bool,
    /// Whether the PriceFlex branding can be removed from the banner.
    pub can_remove_branding: bool,
}

const FREE: TierLimits = TierLimits {
    name: "Free",
    price_in_cents: 0,
    max_number_of_products: 1,
    max_number_of_visits: 5_000,
    can_access_analytics: false,
    can_customize_banner: false,
    can_remove_branding: false,
};

const BASIC: TierLimits = TierLimits {
    name: "Basic",
    price_in_cents: 1_900,
    max_number_of_products: 5,
    max_number_of_visits: 10_000,
    can_access_analytics: true,
    can_customize_banner: false,
    can_remove_branding: true,
};

const STANDARD: TierLimits = TierLimits {
    name: "Standard",
    price_in_cents: 4_900,
    max_number_of_products: 30,
    max_number_of_visits: 100_000,
    can_access_analytics: true,
    can_customize_banner: true,
    can_remove_branding: true,
};

const PREMIUM: TierLimits = TierLimits {
    name: "Premium",
    price_in_cents: 9_900,
    max_number_of_products: 50,
    max_number_of_visits: 1_000_000,
    can_access_analytics: true,
    can_customize_banner: true,
    can_remove_branding: true,
};

// ============================================================================
// Tier
// ============================================================================

/// Available subscription tiers.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Tier {
    /// Free tier: one product, no analytics.
    #[default]
    Free,
    /// Basic tier: analytics and branding removal.
    Basic,
    /// Standard tier: adds banner customization. Marketed as most popular.
    Standard,
    /// Premium tier: highest limits.
    Premium,
}

impl Tier {
    /// All tiers in display order.
    pub const IN_ORDER: [Tier; 4] = [Tier::Free, Tier::Basic, Tier::Standard, Tier::Premium];

    /// Get the limits for this tier.
    #[must_use]
    pub const fn limits(&self) -> &'static TierLimits {
        match self {
            Self::Free => &FREE,
            Self::Basic => &BASIC,
            Self::Standard => &STANDARD,
            Self::Premium => &PREMIUM,
        }
    }

    /// The tier name as stored in the database.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        self.limits().name
    }

    /// Whether the pricing page highlights this tier.
    #[must_use]
    pub const fn is_most_popular(&self) -> bool {
        matches!(self, Self::Standard)
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tier::IN_ORDER
            .into_iter()
            .find(|tier| tier.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CoreError::UnknownTier(s.to_string()))
    }
}
