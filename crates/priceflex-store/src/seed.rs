//! Bundled country group reference data.

use std::collections::HashSet;

use priceflex_core::CountryGroupSeed;

use crate::error::{Result, StoreError};

/// The country group seed file shipped with the crate.
pub const COUNTRY_GROUPS_JSON: &str = include_str!("../data/country_groups.json");

/// Parse the bundled seed file.
///
/// # Errors
///
/// Returns `StoreError::Serialization` if the file is malformed or lists a
/// country code twice.
pub fn bundled_country_groups() -> Result<Vec<CountryGroupSeed>> {
    parse_country_groups(COUNTRY_GROUPS_JSON)
}

/// Parse country group seeds from JSON.
///
/// Country codes are upper-cased. Each code and each group name may appear
/// only once.
///
/// # Errors
///
/// Returns `StoreError::Serialization` on malformed JSON or duplicates.
pub fn parse_country_groups(json: &str) -> Result<Vec<CountryGroupSeed>> {
    let mut groups: Vec<CountryGroupSeed> = serde_json::from_str(json)?;

    let mut names = HashSet::new();
    let mut codes = HashSet::new();
    for group in &mut groups {
        if !names.insert(group.name.clone()) {
            return Err(StoreError::Serialization(format!(
                "duplicate country group: {}",
                group.name
            )));
        }
        for country in &mut group.countries {
            country.country = country.country.trim().to_ascii_uppercase();
            if !codes.insert(country.country.clone()) {
                return Err(StoreError::Serialization(format!(
                    "duplicate country code: {}",
                    country.country
                )));
            }
        }
    }

    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_file_parses() {
        let groups = bundled_country_groups().unwrap();
        assert!(!groups.is_empty());
        assert!(groups
            .iter()
            .flat_map(|g| &g.countries)
            .any(|c| c.country == "IN" && c.country_name == "India"));
    }

    #[test]
    fn codes_are_uppercased() {
        let groups =
            parse_country_groups(r#"[{"name":"A","countries":[{"countryName":"X","country":"xx"}]}]"#)
                .unwrap();
        assert_eq!(groups[0].countries[0].country, "XX");
        assert_eq!(groups[0].recommended_discount_percentage, None);
    }

    #[test]
    fn duplicate_codes_are_rejected() {
        let json = r#"[
            {"name":"A","countries":[{"countryName":"X","country":"XX"}]},
            {"name":"B","countries":[{"countryName":"Y","country":"xx"}]}
        ]"#;
        assert!(matches!(
            parse_country_groups(json),
            Err(StoreError::Serialization(_))
        ));
    }
}
