//! Core types and utilities for PriceFlex.
//!
//! This crate provides the foundational types used throughout the PriceFlex service:
//!
//! - **Identifiers**: `UserId`, `ProductId`, `CountryId`, `CountryGroupId`
//! - **Subscriptions**: `Tier`, `TierLimits`, `UserSubscription`
//! - **Products**: `Product`, `ProductDetails`, `ProductCustomization`
//! - **Countries**: `Country`, `CountryGroup`, `CountryGroupDiscount`
//! - **Analytics**: `ChartInterval`, `DisplayTimezone`, `DailyViews`
//! - **Permissions**: `Permission` and the capability checks built on tiers
//!
//! # Discount Percentages
//!
//! Discounts are stored as fractions in `[0, 1]` (a 20% discount is `0.2`).
//! Request payloads carry whole percentages and are converted at the boundary.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod analytics;
pub mod country;
pub mod customization;
pub mod error;
pub mod format;
pub mod ids;
pub mod permissions;
pub mod product;
pub mod subscription;
pub mod tier;

pub use analytics::{
    zero_fill, ChartInterval, CountryGroupViews, CountryViews, DailyViews, DayRange,
    DisplayTimezone, ViewFilter,
};
pub use country::{
    Country, CountryGroup, CountryGroupDiscount, CountryGroupSeed, CountryGroupWithDiscount,
    CountrySeed, DiscountChanges, DiscountEntry, GroupDiscount, SyncSummary,
};
pub use customization::{
    BannerMessage, CustomizationUpdate, ProductCustomization, DEFAULT_BACKGROUND_COLOR,
    DEFAULT_BANNER_CONTAINER, DEFAULT_FONT_SIZE, DEFAULT_IS_STICKY, DEFAULT_LOCATION_MESSAGE,
    DEFAULT_TEXT_COLOR,
};
pub use error::{CoreError, Result};
pub use format::format_compact_number;
pub use ids::{CountryGroupId, CountryId, IdError, ProductId, ProductViewId, SubscriptionId, UserId};
pub use permissions::{
    can_access_analytics, can_create_product, can_customize_banner, can_remove_branding,
    can_show_discount_banner, Permission,
};
pub use product::{normalize_url, Product, ProductDetails, ProductView};
pub use subscription::{BillingUpdate, NewUserSubscription, UserSubscription};
pub use tier::{Tier, TierLimits};
