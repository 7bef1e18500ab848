//! Products and product view events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::ids::{CountryId, ProductId, ProductViewId, UserId};

/// A product listed by a seller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
    /// Product ID.
    pub id: ProductId,
    /// The owning user.
    pub owner: UserId,
    /// Display name.
    pub name: String,
    /// Site the banner is embedded on, without trailing slash.
    pub url: String,
    /// Optional free-form description.
    pub description: Option<String>,
    /// When the product was created.
    pub created_at: DateTime<Utc>,
    /// When the product was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Editable product fields, used for both create and update.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProductDetails {
    /// Display name.
    pub name: String,
    /// Site the banner is embedded on.
    pub url: String,
    /// Optional description; blank is treated as absent.
    #[serde(default)]
    pub description: Option<String>,
}

impl ProductDetails {
    /// Validate and normalize the fields.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Validation` if the name is blank or the URL is not an
    /// absolute http(s) URL.
    pub fn validate(self) -> Result<Self> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(CoreError::validation("name", "name is required"));
        }

        let url = self.url.trim();
        if !is_http_url(url) {
            return Err(CoreError::validation(
                "url",
                "url must be an absolute http(s) URL",
            ));
        }

        let description = self
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());

        Ok(Self {
            name,
            url: normalize_url(url),
            description,
        })
    }
}

/// One banner load for a product. Never updated once recorded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductView {
    /// View ID.
    pub id: ProductViewId,
    /// Product whose banner was requested.
    pub product_id: ProductId,
    /// Country resolved from the request, if any.
    pub country_id: Option<CountryId>,
    /// When the banner was requested.
    pub visited_at: DateTime<Utc>,
}

/// Strip trailing slashes so `https://a.com/` and `https://a.com` compare equal.
#[must_use]
pub fn normalize_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

fn is_http_url(url: &str) -> bool {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"));

    match rest {
        Some(rest) => {
            let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
            !host.is_empty() && !rest.chars().any(char::is_whitespace)
        }
        None => false,
    }
}
