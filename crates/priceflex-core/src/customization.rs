//! Discount banner customization.
//!
//! Every product owns exactly one customization row, created with the defaults
//! below when the product is created. The defaults are part of the stored
//! schema and must match the SQL column defaults byte for byte.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::ids::ProductId;

/// Default banner message. Placeholders are `{country}`, `{coupon}` and `{discount}`.
pub const DEFAULT_LOCATION_MESSAGE: &str = "Hi! It looks like you are from <b>{country}</b>. We support Parity Purchasing Power. If you need it, use code <b>\"{coupon}\"</b> to get <b>{discount}%</b> off.";

/// Default banner background color.
pub const DEFAULT_BACKGROUND_COLOR: &str = "hsl(193, 82%, 31%";

/// Default banner text color.
pub const DEFAULT_TEXT_COLOR: &str = "hsl(0, 0%, 100%";

/// Default banner font size.
pub const DEFAULT_FONT_SIZE: &str = "1rem";

/// Default CSS selector the banner is inserted into.
pub const DEFAULT_BANNER_CONTAINER: &str = "body";

/// Whether the banner sticks to the top of the viewport by default.
pub const DEFAULT_IS_STICKY: bool = true;

/// Banner configuration for one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductCustomization {
    /// The product this customization belongs to.
    pub product_id: ProductId,
    /// Optional CSS class prefix to avoid collisions on the host page.
    pub class_prefix: Option<String>,
    /// Message template.
    pub location_message: String,
    /// CSS background color.
    pub background_color: String,
    /// CSS text color.
    pub text_color: String,
    /// CSS font size.
    pub font_size: String,
    /// CSS selector of the banner container.
    pub banner_container: String,
    /// Whether the banner is sticky.
    pub is_sticky: bool,
    /// When the row was created.
    pub created_at: DateTime<Utc>,
    /// When the row was last updated.
    pub updated_at: DateTime<Utc>,
}

impl ProductCustomization {
    /// The customization a new product starts with.
    #[must_use]
    pub fn defaults_for(product_id: ProductId, now: DateTime<Utc>) -> Self {
        Self {
            product_id,
            class_prefix: None,
            location_message: DEFAULT_LOCATION_MESSAGE.to_string(),
            background_color: DEFAULT_BACKGROUND_COLOR.to_string(),
            text_color: DEFAULT_TEXT_COLOR.to_string(),
            font_size: DEFAULT_FONT_SIZE.to_string(),
            banner_container: DEFAULT_BANNER_CONTAINER.to_string(),
            is_sticky: DEFAULT_IS_STICKY,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply an update in place.
    pub fn apply(&mut self, update: CustomizationUpdate, now: DateTime<Utc>) {
        self.class_prefix = update.class_prefix;
        self.location_message = update.location_message;
        self.background_color = update.background_color;
        self.text_color = update.text_color;
        self.font_size = update.font_size;
        self.banner_container = update.banner_container;
        self.is_sticky = update.is_sticky;
        self.updated_at = now;
    }

    /// Substitute the message placeholders.
    ///
    /// `discount_fraction` is the stored fraction; the message shows whole
    /// percentages (`0.2` renders as `20`, `0.125` as `12.5`).
    #[must_use]
    pub fn render_message(&self, message: &BannerMessage<'_>) -> String {
        let percent = (message.discount_fraction * 10_000.0).round() / 100.0;
        self.location_message
            .replace("{country}", message.country)
            .replace("{coupon}", message.coupon)
            .replace("{discount}", &percent.to_string())
    }
}

/// Values substituted into the banner message.
#[derive(Debug, Clone, Copy)]
pub struct BannerMessage<'a> {
    /// Country display name.
    pub country: &'a str,
    /// Coupon code.
    pub coupon: &'a str,
    /// Discount as a fraction in `[0, 1]`.
    pub discount_fraction: f64,
}

/// New values for a customization. All style fields are required.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CustomizationUpdate {
    /// Optional CSS class prefix.
    #[serde(default)]
    pub class_prefix: Option<String>,
    /// Message template.
    pub location_message: String,
    /// CSS background color.
    pub background_color: String,
    /// CSS text color.
    pub text_color: String,
    /// CSS font size.
    pub font_size: String,
    /// CSS selector of the banner container.
    pub banner_container: String,
    /// Whether the banner is sticky.
    pub is_sticky: bool,
}

impl CustomizationUpdate {
    /// Validate the update, trimming fields and treating a blank prefix as absent.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Validation` naming the first blank style field.
    pub fn validate(self) -> Result<Self> {
        fn required(field: &'static str, value: String) -> Result<String> {
            let value = value.trim().to_string();
            if value.is_empty() {
                return Err(CoreError::validation(field, format!("{field} is required")));
            }
            Ok(value)
        }

        Ok(Self {
            class_prefix: self
                .class_prefix
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty()),
            location_message: required("location_message", self.location_message)?,
            background_color: required("background_color", self.background_color)?,
            text_color: required("text_color", self.text_color)?,
            font_size: required("font_size", self.font_size)?,
            banner_container: required("banner_container", self.banner_container)?,
            is_sticky: self.is_sticky,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_message_renders_all_placeholders() {
        let customization = ProductCustomization::defaults_for(ProductId::generate(), Utc::now());
        let rendered = customization.render_message(&BannerMessage {
            country: "India",
            coupon: "PPP40",
            discount_fraction: 0.4,
        });
        assert_eq!(
            rendered,
            "Hi! It looks like you are from <b>India</b>. We support Parity Purchasing Power. \
             If you need it, use code <b>\"PPP40\"</b> to get <b>40%</b> off."
        );
    }

    #[test]
    fn fractional_percentages_keep_their_decimals() {
        let mut customization =
            ProductCustomization::defaults_for(ProductId::generate(), Utc::now());
        customization.location_message = "{discount}".into();
        let render = |fraction| {
            customization.render_message(&BannerMessage {
                country: "",
                coupon: "",
                discount_fraction: fraction,
            })
        };
        assert_eq!(render(0.125), "12.5");
        assert_eq!(render(0.35), "35");
        assert_eq!(render(0.0), "0");
    }

    #[test]
    fn update_requires_style_fields() {
        let update = CustomizationUpdate {
            class_prefix: Some("  ".into()),
            location_message: "Hello {country}".into(),
            background_color: "red".into(),
            text_color: " ".into(),
            font_size: "1rem".into(),
            banner_container: "body".into(),
            is_sticky: false,
        };
        let err = update.clone().validate().unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation {
                field: "text_color",
                ..
            }
        ));

        let ok = CustomizationUpdate {
            text_color: "white".into(),
            ..update
        }
        .validate()
        .unwrap();
        assert_eq!(ok.class_prefix, None);
    }
}
