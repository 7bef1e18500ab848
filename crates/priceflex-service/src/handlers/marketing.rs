//! Public marketing page.

use axum::Json;
use serde::Serialize;

use priceflex_core::{format_compact_number, Tier, TierLimits};

const HEADLINE: &str = "Price Smarter, Sell Bigger!";
const SUBHEADLINE: &str = "Optimize your product pricing across countries to maximize sales. Capture 85% of the untapped market with location-based dynamic pricing";
const PRICING_HEADLINE: &str = "Pricing software which pays for itself 20 times over";

/// Marketing page payload.
#[derive(Debug, Serialize)]
pub struct MarketingPage {
    /// Hero headline.
    pub headline: &'static str,
    /// Hero subheadline.
    pub subheadline: &'static str,
    /// Heading above the pricing cards.
    pub pricing_headline: &'static str,
    /// One card per tier, in display order.
    pub pricing: Vec<PricingCard>,
    /// Footer link groups.
    pub footer: Vec<FooterLinkGroup>,
}

/// A tier's pricing card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PricingCard {
    /// Tier name.
    pub name: &'static str,
    /// Monthly price, e.g. `€19/mo`.
    pub price: String,
    /// Visit quota, e.g. `10K pricing page visits/mo`.
    pub visits: String,
    /// Product quota, e.g. `5 products`.
    pub products: String,
    /// Included features.
    pub features: Vec<&'static str>,
    /// Whether the card is highlighted.
    pub is_most_popular: bool,
}

impl PricingCard {
    /// Build the card for `tier`.
    #[must_use]
    pub fn for_tier(tier: Tier) -> Self {
        let limits: &TierLimits = tier.limits();

        let mut features = vec!["PPP discounts"];
        if limits.can_access_analytics {
            features.push("Advanced analytics");
        }
        if limits.can_remove_branding {
            features.push("Remove PriceFlex Branding");
        }
        if limits.can_customize_banner {
            features.push("Banner Customization");
        }

        let products = limits.max_number_of_products;
        Self {
            name: limits.name,
            price: format!("€{}/mo", format_price(limits.price_in_cents)),
            visits: format!(
                "{} pricing page visits/mo",
                format_compact_number(limits.max_number_of_visits)
            ),
            products: format!("{products} {}", if products == 1 { "product" } else { "products" }),
            features,
            is_most_popular: tier.is_most_popular(),
        }
    }
}

/// Euro amount of `cents` as a plain number: `1900` is `19`, `1950` is `19.5`.
fn format_price(cents: u32) -> String {
    (f64::from(cents) / 100.0).to_string()
}

/// A titled group of footer links.
#[derive(Debug, Serialize)]
pub struct FooterLinkGroup {
    /// Group title.
    pub title: &'static str,
    /// Links in the group.
    pub links: Vec<FooterLink>,
}

/// A footer link.
#[derive(Debug, Serialize)]
pub struct FooterLink {
    /// Link text.
    pub label: &'static str,
    /// Link target.
    pub href: &'static str,
}

/// Marketing page endpoint.
pub async fn home() -> Json<MarketingPage> {
    Json(MarketingPage {
        headline: HEADLINE,
        subheadline: SUBHEADLINE,
        pricing_headline: PRICING_HEADLINE,
        pricing: Tier::IN_ORDER.into_iter().map(PricingCard::for_tier).collect(),
        footer: vec![FooterLinkGroup {
            title: "Help",
            links: vec![
                FooterLink {
                    label: "PPP Discounts",
                    href: "#",
                },
                FooterLink {
                    label: "Discount API",
                    href: "#",
                },
            ],
        }],
    })
}
