//! Storage layer for PriceFlex.
//!
//! This crate provides the data-access layer for products, banner
//! customizations, country group discounts, product views and user
//! subscriptions.
//!
//! # Backends
//!
//! - [`PgStore`]: PostgreSQL via sqlx. Schema in `migrations/`.
//! - [`MemoryStore`]: in-process tables with the same constraints, used by
//!   tests and local development.
//!
//! # Scoping
//!
//! Every read and mutation is scoped by the owning user. Reads of rows the
//! caller does not own return `None` or an empty collection; mutations of such
//! rows return `false`. Errors are reserved for storage failures and
//! constraint violations.
//!
//! # Example
//!
//! ```no_run
//! use priceflex_store::{PgStore, Store};
//! use priceflex_core::{NewUserSubscription, Tier, UserId};
//!
//! # async fn run() -> priceflex_store::Result<()> {
//! let store = PgStore::connect("postgres://localhost/priceflex", 5).await?;
//! store.migrate().await?;
//!
//! let user: UserId = "user_2abc".parse().expect("valid user id");
//! store
//!     .create_user_subscription(&NewUserSubscription { user_id: user.clone(), tier: Tier::Free })
//!     .await?;
//! let products = store.get_products(&user, Some(6)).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod memory;
pub mod models;
pub mod pg;
pub mod schema;
pub mod seed;

pub use error::{Result, StoreError};
pub use memory::{FailPoint, MemoryStore, RowCounts};
pub use pg::PgStore;
pub use seed::bundled_country_groups;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use priceflex_core::{
    BillingUpdate, Country, CountryGroupDiscount, CountryGroupSeed, CountryGroupViews,
    CountryGroupWithDiscount, CountryId, CountryViews, CustomizationUpdate, DiscountChanges,
    DisplayTimezone, GroupDiscount, NewUserSubscription, Product, ProductCustomization,
    ProductDetails, ProductId, ProductView, SyncSummary, UserId, UserSubscription, ViewFilter,
};

/// Everything needed to render a product's discount banner.
#[derive(Debug, Clone, PartialEq)]
pub struct BannerTarget {
    /// The product whose banner was requested.
    pub product: Product,
    /// Its banner customization.
    pub customization: ProductCustomization,
    /// The visitor's country, if the code resolved.
    pub country: Option<Country>,
    /// The product's discount for the visitor's country group, if any.
    pub discount: Option<GroupDiscount>,
}

/// Rows removed by [`Store::delete_user`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeletedUser {
    /// Subscription rows removed.
    pub subscriptions: u64,
    /// Product rows removed (dependents cascade).
    pub products: u64,
}

/// The storage trait defining all database operations.
///
/// This trait abstracts the storage layer, allowing for different implementations
/// (PostgreSQL, in-memory for testing).
#[async_trait]
pub trait Store: Send + Sync {
    // =========================================================================
    // Subscription Operations
    // =========================================================================

    /// Create a subscription unless the user already has one.
    ///
    /// Returns `true` if a row was inserted. Duplicate or concurrent calls for
    /// the same user leave exactly one row.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn create_user_subscription(&self, subscription: &NewUserSubscription) -> Result<bool>;

    /// Get a user's subscription.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_user_subscription(&self, user_id: &UserId) -> Result<Option<UserSubscription>>;

    /// Apply a billing update to the user's subscription.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn update_subscription_by_user(
        &self,
        user_id: &UserId,
        update: &BillingUpdate,
    ) -> Result<bool>;

    /// Apply a billing update to the subscription with this Stripe customer.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn update_subscription_by_customer(
        &self,
        stripe_customer_id: &str,
        update: &BillingUpdate,
    ) -> Result<bool>;

    /// Delete a user's subscription and every product they own, atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails; nothing is deleted
    /// in that case.
    async fn delete_user(&self, user_id: &UserId) -> Result<DeletedUser>;

    // =========================================================================
    // Product Operations
    // =========================================================================

    /// List a user's products, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_products(&self, user_id: &UserId, limit: Option<usize>) -> Result<Vec<Product>>;

    /// Count a user's products.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn count_products(&self, user_id: &UserId) -> Result<u64>;

    /// Get one of the user's products.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_product(&self, product_id: ProductId, user_id: &UserId)
        -> Result<Option<Product>>;

    /// Create a product together with its default banner customization.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn create_product(&self, user_id: &UserId, details: &ProductDetails) -> Result<Product>;

    /// Create a product unless the user already owns `max_products`.
    ///
    /// Counting and inserting happen atomically, so concurrent calls for one
    /// user never exceed the limit. Returns `None` when the limit is reached.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn create_product_within_limit(
        &self,
        user_id: &UserId,
        details: &ProductDetails,
        max_products: u64,
    ) -> Result<Option<Product>>;

    /// Replace a product's editable fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn update_product(
        &self,
        product_id: ProductId,
        user_id: &UserId,
        details: &ProductDetails,
    ) -> Result<bool>;

    /// Delete a product and, by cascade, its customization, discounts and views.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn delete_product(&self, product_id: ProductId, user_id: &UserId) -> Result<bool>;

    // =========================================================================
    // Customization Operations
    // =========================================================================

    /// Get a product's banner customization.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_product_customization(
        &self,
        product_id: ProductId,
        user_id: &UserId,
    ) -> Result<Option<ProductCustomization>>;

    /// Replace a product's banner customization.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn update_product_customization(
        &self,
        product_id: ProductId,
        user_id: &UserId,
        update: &CustomizationUpdate,
    ) -> Result<bool>;

    // =========================================================================
    // Country Group Operations
    // =========================================================================

    /// List every country group with its countries and this product's discount.
    ///
    /// Groups are ordered by recommended discount (highest first, unset last),
    /// then by name. Countries are ordered by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_country_groups(
        &self,
        product_id: ProductId,
        user_id: &UserId,
    ) -> Result<Vec<CountryGroupWithDiscount>>;

    /// Insert a discount.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Conflict` if the product already has a discount for
    /// the group, or `StoreError::NotFound` if either parent is missing.
    async fn insert_country_group_discount(&self, discount: &CountryGroupDiscount) -> Result<()>;

    /// Apply discount edits to one of the user's products in one transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn update_country_discounts(
        &self,
        product_id: ProductId,
        user_id: &UserId,
        changes: &DiscountChanges,
    ) -> Result<bool>;

    /// Upsert country groups by name and countries by code.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn sync_country_groups(&self, seeds: &[CountryGroupSeed]) -> Result<SyncSummary>;

    // =========================================================================
    // Banner & View Operations
    // =========================================================================

    /// Resolve a public banner request.
    ///
    /// Matches the product by ID and by its stored URL, which must equal the
    /// normalized `url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_banner_target(
        &self,
        product_id: ProductId,
        url: &str,
        country_code: Option<&str>,
    ) -> Result<Option<BannerTarget>>;

    /// Record a banner load.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the product or country is missing.
    async fn record_product_view(
        &self,
        product_id: ProductId,
        country_id: Option<CountryId>,
        visited_at: DateTime<Utc>,
    ) -> Result<ProductView>;

    /// Count views of all the user's products at or after `since`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn count_views_since(&self, user_id: &UserId, since: DateTime<Utc>) -> Result<u64>;

    /// The earliest view matching the filter.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn first_view_at(&self, filter: &ViewFilter) -> Result<Option<DateTime<Utc>>>;

    /// Views per local calendar day in `timezone`, ascending. Days without
    /// views are omitted.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn views_by_local_day(
        &self,
        filter: &ViewFilter,
        timezone: &DisplayTimezone,
    ) -> Result<Vec<(NaiveDate, u64)>>;

    /// Views per resolved country, most viewed first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn views_by_country(&self, filter: &ViewFilter) -> Result<Vec<CountryViews>>;

    /// Views per country group, including groups with no views.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn views_by_country_group(&self, filter: &ViewFilter) -> Result<Vec<CountryGroupViews>>;
}
