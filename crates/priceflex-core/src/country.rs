//! Countries, purchasing-power groups and per-product group discounts.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::ids::{CountryGroupId, CountryId, ProductId};

/// A set of countries sharing one discount policy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryGroup {
    /// Group ID.
    pub id: CountryGroupId,
    /// Unique group name.
    pub name: String,
    /// Suggested discount as a fraction, if the seed data provides one.
    pub recommended_discount_percentage: Option<f64>,
}

/// A country and the group it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Country {
    /// Country ID.
    pub id: CountryId,
    /// Unique display name.
    pub name: String,
    /// Unique ISO 3166-1 alpha-2 code.
    pub code: String,
    /// The group this country belongs to.
    pub country_group_id: CountryGroupId,
}

/// A product's coupon for one country group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryGroupDiscount {
    /// The country group.
    pub country_group_id: CountryGroupId,
    /// The product.
    pub product_id: ProductId,
    /// Coupon code shown in the banner.
    pub coupon: String,
    /// Discount as a fraction in `[0, 1]`.
    pub discount_percentage: f64,
}

/// The coupon and discount of a group discount, without its keys.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupDiscount {
    /// Coupon code.
    pub coupon: String,
    /// Discount as a fraction in `[0, 1]`.
    pub discount_percentage: f64,
}

/// A group with its countries and one product's discount for it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryGroupWithDiscount {
    /// The group.
    #[serde(flatten)]
    pub group: CountryGroup,
    /// Countries in the group, ordered by name.
    pub countries: Vec<Country>,
    /// The product's discount for this group, if configured.
    pub discount: Option<GroupDiscount>,
}

// ============================================================================
// Discount edits
// ============================================================================

/// One row of the discount form.
///
/// Both fields empty removes the discount; both present sets it. The
/// percentage is a whole number in `[0, 100]`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DiscountEntry {
    /// The group being edited.
    pub country_group_id: CountryGroupId,
    /// Coupon code, blank to clear.
    #[serde(default)]
    pub coupon: Option<String>,
    /// Whole percentage, absent to clear.
    #[serde(default)]
    pub discount_percentage: Option<f64>,
}

/// Validated discount edits for one product.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiscountChanges {
    /// Groups whose discount is removed.
    pub delete: Vec<CountryGroupId>,
    /// Discounts inserted or overwritten.
    pub upsert: Vec<CountryGroupDiscount>,
}

impl DiscountChanges {
    /// Validate form entries for `product_id`.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Validation` if an entry sets only one of coupon and
    /// percentage, or the percentage is outside `[0, 100]`.
    pub fn from_entries(product_id: ProductId, entries: Vec<DiscountEntry>) -> Result<Self> {
        let mut changes = Self::default();

        for entry in entries {
            let coupon = entry
                .coupon
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty());

            match (coupon, entry.discount_percentage) {
                (None, None) => changes.delete.push(entry.country_group_id),
                (Some(coupon), Some(percent)) => {
                    if !(0.0..=100.0).contains(&percent) {
                        return Err(CoreError::validation(
                            "discount_percentage",
                            "discount must be between 0 and 100",
                        ));
                    }
                    changes.upsert.push(CountryGroupDiscount {
                        country_group_id: entry.country_group_id,
                        product_id,
                        coupon,
                        discount_percentage: percent / 100.0,
                    });
                }
                (Some(_), None) => {
                    return Err(CoreError::validation(
                        "discount_percentage",
                        "discount is required when a coupon is set",
                    ))
                }
                (None, Some(_)) => {
                    return Err(CoreError::validation(
                        "coupon",
                        "coupon is required when a discount is set",
                    ))
                }
            }
        }

        Ok(changes)
    }
}

// ============================================================================
// Seed data
// ============================================================================

/// A country group as listed in the seed file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountryGroupSeed {
    /// Group name.
    pub name: String,
    /// Suggested discount as a fraction.
    pub recommended_discount_percentage: Option<f64>,
    /// Member countries.
    pub countries: Vec<CountrySeed>,
}

/// A country as listed in the seed file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountrySeed {
    /// Display name.
    pub country_name: String,
    /// ISO 3166-1 alpha-2 code.
    pub country: String,
}

/// Row counts touched by a seed synchronisation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    /// Groups inserted or updated.
    pub country_groups: usize,
    /// Countries inserted or updated.
    pub countries: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(coupon: Option<&str>, percent: Option<f64>) -> DiscountEntry {
        DiscountEntry {
            country_group_id: CountryGroupId::generate(),
            coupon: coupon.map(String::from),
            discount_percentage: percent,
        }
    }

    #[test]
    fn entries_split_into_deletes_and_upserts() {
        let product_id = ProductId::generate();
        let cleared = entry(Some("  "), None);
        let set = entry(Some("PPP20"), Some(20.0));

        let changes =
            DiscountChanges::from_entries(product_id, vec![cleared.clone(), set.clone()]).unwrap();

        assert_eq!(changes.delete, vec![cleared.country_group_id]);
        assert_eq!(changes.upsert.len(), 1);
        assert_eq!(changes.upsert[0].country_group_id, set.country_group_id);
        assert_eq!(changes.upsert[0].coupon, "PPP20");
        assert!((changes.upsert[0].discount_percentage - 0.2).abs() < f64::EPSILON);
    }

    #[test]
    fn half_filled_entries_are_rejected() {
        let product_id = ProductId::generate();
        assert!(DiscountChanges::from_entries(product_id, vec![entry(Some("X"), None)]).is_err());
        assert!(DiscountChanges::from_entries(product_id, vec![entry(None, Some(5.0))]).is_err());
    }

    #[test]
    fn percentage_must_be_in_range() {
        let product_id = ProductId::generate();
        let err =
            DiscountChanges::from_entries(product_id, vec![entry(Some("X"), Some(120.0))])
                .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation {
                field: "discount_percentage",
                ..
            }
        ));
    }

    #[test]
    fn seed_file_format() {
        let json = r#"[{"name":"Group 1","recommendedDiscountPercentage":0.6,
            "countries":[{"countryName":"India","country":"IN"}]}]"#;
        let seeds: Vec<CountryGroupSeed> = serde_json::from_str(json).unwrap();
        assert_eq!(seeds[0].countries[0].country, "IN");
        assert_eq!(seeds[0].recommended_discount_percentage, Some(0.6));
    }
}
