//! In-memory storage implementation.
//!
//! `MemoryStore` keeps every table in process and enforces the same
//! constraints as the PostgreSQL schema: unique keys, the composite discount
//! key, insert-or-ignore subscriptions and cascading deletes.
//!
//! Multi-step mutations run against a staged copy of the tables that replaces
//! the live copy only when the whole operation succeeds. A [`FailPoint`] can
//! be armed to abort one midway and observe that nothing was applied.
//! Single-step mutations check first and then write in place, so recording a
//! view does not copy the tables.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::RwLock;

use priceflex_core::{
    normalize_url, BillingUpdate, Country, CountryGroup, CountryGroupDiscount, CountryGroupId,
    CountryGroupSeed, CountryGroupViews, CountryGroupWithDiscount, CountryId, CountryViews,
    CustomizationUpdate, DiscountChanges, DisplayTimezone, GroupDiscount, NewUserSubscription,
    Product, ProductCustomization, ProductDetails, ProductId, ProductView, ProductViewId,
    SubscriptionId, SyncSummary, UserId, UserSubscription, ViewFilter,
};

use crate::error::{Result, StoreError};
use crate::{BannerTarget, DeletedUser, Store};

/// A point inside a multi-step mutation where a failure can be injected.
///
/// An armed fail point fires once and then disarms itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    /// In `delete_user`, after the subscription is removed and before the products.
    DeleteUserAfterSubscription,
    /// In `create_product`, after the product and before its customization.
    CreateProductBeforeCustomization,
    /// In `update_country_discounts`, after deletes and before upserts.
    UpdateDiscountsAfterDelete,
    /// In `sync_country_groups`, after groups and before countries.
    SyncAfterGroups,
}

/// Number of rows in each table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowCounts {
    /// `user_subscription` rows.
    pub subscriptions: usize,
    /// `products` rows.
    pub products: usize,
    /// `product_customizations` rows.
    pub customizations: usize,
    /// `country_groups` rows.
    pub country_groups: usize,
    /// `countries` rows.
    pub countries: usize,
    /// `country_group_discounts` rows.
    pub discounts: usize,
    /// `product_views` rows.
    pub views: usize,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    subscriptions: HashMap<UserId, UserSubscription>,
    /// Insertion order.
    products: Vec<Product>,
    customizations: HashMap<ProductId, ProductCustomization>,
    country_groups: Vec<CountryGroup>,
    countries: Vec<Country>,
    discounts: HashMap<(CountryGroupId, ProductId), CountryGroupDiscount>,
    views: Vec<ProductView>,
}

impl Tables {
    fn product(&self, product_id: ProductId) -> Option<&Product> {
        self.products.iter().find(|p| p.id == product_id)
    }

    fn owned_product(&self, product_id: ProductId, user_id: &UserId) -> Option<&Product> {
        self.product(product_id).filter(|p| &p.owner == user_id)
    }

    fn country(&self, country_id: CountryId) -> Option<&Country> {
        self.countries.iter().find(|c| c.id == country_id)
    }

    /// Remove a product and everything that references it.
    fn delete_product(&mut self, product_id: ProductId) {
        self.products.retain(|p| p.id != product_id);
        self.customizations.remove(&product_id);
        self.discounts.retain(|(_, product), _| *product != product_id);
        self.views.retain(|v| v.product_id != product_id);
    }

    fn sorted_groups(&self) -> Vec<&CountryGroup> {
        let mut groups: Vec<_> = self.country_groups.iter().collect();
        groups.sort_by(|a, b| group_order(a, b));
        groups
    }

    fn matching_views<'a>(
        &'a self,
        filter: &'a ViewFilter,
    ) -> impl Iterator<Item = &'a ProductView> {
        self.views.iter().filter(move |view| {
            filter.product_id.map_or(true, |id| view.product_id == id)
                && filter.since.map_or(true, |since| view.visited_at >= since)
                && self
                    .product(view.product_id)
                    .is_some_and(|p| p.owner == filter.owner)
        })
    }

    fn row_counts(&self) -> RowCounts {
        RowCounts {
            subscriptions: self.subscriptions.len(),
            products: self.products.len(),
            customizations: self.customizations.len(),
            country_groups: self.country_groups.len(),
            countries: self.countries.len(),
            discounts: self.discounts.len(),
            views: self.views.len(),
        }
    }
}

/// Highest recommended discount first, groups without one last, then by name.
fn group_order(a: &CountryGroup, b: &CountryGroup) -> Ordering {
    let by_discount = match (
        a.recommended_discount_percentage,
        b.recommended_discount_percentage,
    ) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_discount.then_with(|| a.name.cmp(&b.name))
}

/// A staged copy of the tables for one mutation.
struct Txn<'a> {
    tables: Tables,
    fail_point: &'a mut Option<FailPoint>,
}

impl Txn<'_> {
    fn insert_product(
        &mut self,
        user_id: &UserId,
        details: &ProductDetails,
        now: DateTime<Utc>,
    ) -> Result<Product> {
        let product = Product {
            id: ProductId::generate(),
            owner: user_id.clone(),
            name: details.name.clone(),
            url: details.url.clone(),
            description: details.description.clone(),
            created_at: now,
            updated_at: now,
        };
        self.tables.products.push(product.clone());

        self.checkpoint(FailPoint::CreateProductBeforeCustomization)?;

        self.tables.customizations.insert(
            product.id,
            ProductCustomization::defaults_for(product.id, now),
        );
        Ok(product)
    }

    fn checkpoint(&mut self, point: FailPoint) -> Result<()> {
        if *self.fail_point == Some(point) {
            *self.fail_point = None;
            return Err(StoreError::Database(format!(
                "injected failure at {point:?}"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct Inner {
    tables: Tables,
    fail_point: Option<FailPoint>,
}

/// In-memory storage implementation.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a fail point. The next operation that reaches it fails and leaves
    /// the tables unchanged.
    pub async fn fail_at(&self, point: FailPoint) {
        self.inner.write().await.fail_point = Some(point);
    }

    /// Number of rows currently in each table.
    pub async fn row_counts(&self) -> RowCounts {
        self.inner.read().await.tables.row_counts()
    }

    async fn read<T>(&self, f: impl FnOnce(&Tables) -> T) -> T {
        let inner = self.inner.read().await;
        f(&inner.tables)
    }

    /// Run `f` against a staged copy and commit it only if `f` succeeds.
    async fn transaction<T>(&self, f: impl FnOnce(&mut Txn<'_>) -> Result<T>) -> Result<T> {
        let mut guard = self.inner.write().await;
        let Inner { tables, fail_point } = &mut *guard;

        let mut txn = Txn {
            tables: tables.clone(),
            fail_point,
        };
        let out = f(&mut txn)?;
        *tables = txn.tables;
        Ok(out)
    }

    /// Apply a single-step mutation in place. `f` must not fail after writing.
    async fn write<T>(&self, f: impl FnOnce(&mut Tables) -> Result<T>) -> Result<T> {
        let mut inner = self.inner.write().await;
        f(&mut inner.tables)
    }

    async fn update_subscriptions(
        &self,
        matches: impl Fn(&UserSubscription) -> bool,
        update: &BillingUpdate,
    ) -> Result<bool> {
        let now = Utc::now();
        self.write(|tables| {
            let mut updated = false;
            for subscription in tables.subscriptions.values_mut() {
                if matches(subscription) {
                    update.apply(subscription, now);
                    updated = true;
                }
            }
            Ok(updated)
        })
        .await
    }
}

#[async_trait]
impl Store for MemoryStore {
    // =========================================================================
    // Subscription Operations
    // =========================================================================

    async fn create_user_subscription(&self, subscription: &NewUserSubscription) -> Result<bool> {
        let now = Utc::now();
        self.write(|tables| {
            if tables.subscriptions.contains_key(&subscription.user_id) {
                return Ok(false);
            }
            tables.subscriptions.insert(
                subscription.user_id.clone(),
                UserSubscription {
                    id: SubscriptionId::generate(),
                    user_id: subscription.user_id.clone(),
                    stripe_subscription_item_id: None,
                    stripe_subscription_id: None,
                    tier: subscription.tier,
                    stripe_customer_id: None,
                    created_at: now,
                    updated_at: now,
                },
            );
            Ok(true)
        })
        .await
    }

    async fn get_user_subscription(&self, user_id: &UserId) -> Result<Option<UserSubscription>> {
        Ok(self
            .read(|t| t.subscriptions.get(user_id).cloned())
            .await)
    }

    async fn update_subscription_by_user(
        &self,
        user_id: &UserId,
        update: &BillingUpdate,
    ) -> Result<bool> {
        self.update_subscriptions(|s| &s.user_id == user_id, update)
            .await
    }

    async fn update_subscription_by_customer(
        &self,
        stripe_customer_id: &str,
        update: &BillingUpdate,
    ) -> Result<bool> {
        self.update_subscriptions(
            |s| s.stripe_customer_id.as_deref() == Some(stripe_customer_id),
            update,
        )
        .await
    }

    async fn delete_user(&self, user_id: &UserId) -> Result<DeletedUser> {
        self.transaction(|txn| {
            let subscriptions = u64::from(txn.tables.subscriptions.remove(user_id).is_some());

            txn.checkpoint(FailPoint::DeleteUserAfterSubscription)?;

            let owned: Vec<ProductId> = txn
                .tables
                .products
                .iter()
                .filter(|p| &p.owner == user_id)
                .map(|p| p.id)
                .collect();
            for product_id in &owned {
                txn.tables.delete_product(*product_id);
            }

            Ok(DeletedUser {
                subscriptions,
                products: owned.len() as u64,
            })
        })
        .await
    }

    // =========================================================================
    // Product Operations
    // =========================================================================

    async fn get_products(&self, user_id: &UserId, limit: Option<usize>) -> Result<Vec<Product>> {
        Ok(self
            .read(|t| {
                let mut products: Vec<Product> = t
                    .products
                    .iter()
                    .rev()
                    .filter(|p| &p.owner == user_id)
                    .cloned()
                    .collect();
                products.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                products.truncate(limit.unwrap_or(usize::MAX));
                products
            })
            .await)
    }

    async fn count_products(&self, user_id: &UserId) -> Result<u64> {
        Ok(self
            .read(|t| t.products.iter().filter(|p| &p.owner == user_id).count() as u64)
            .await)
    }

    async fn get_product(
        &self,
        product_id: ProductId,
        user_id: &UserId,
    ) -> Result<Option<Product>> {
        Ok(self
            .read(|t| t.owned_product(product_id, user_id).cloned())
            .await)
    }

    async fn create_product(&self, user_id: &UserId, details: &ProductDetails) -> Result<Product> {
        let now = Utc::now();
        self.transaction(|txn| txn.insert_product(user_id, details, now)).await
    }

    async fn create_product_within_limit(
        &self,
        user_id: &UserId,
        details: &ProductDetails,
        max_products: u64,
    ) -> Result<Option<Product>> {
        let now = Utc::now();
        self.transaction(|txn| {
            let existing = txn
                .tables
                .products
                .iter()
                .filter(|p| &p.owner == user_id)
                .count() as u64;
            if existing >= max_products {
                return Ok(None);
            }
            txn.insert_product(user_id, details, now).map(Some)
        })
        .await
    }

    async fn update_product(
        &self,
        product_id: ProductId,
        user_id: &UserId,
        details: &ProductDetails,
    ) -> Result<bool> {
        let now = Utc::now();
        self.write(|tables| {
            let Some(product) = tables
                .products
                .iter_mut()
                .find(|p| p.id == product_id && &p.owner == user_id)
            else {
                return Ok(false);
            };
            product.name.clone_from(&details.name);
            product.url.clone_from(&details.url);
            product.description.clone_from(&details.description);
            product.updated_at = now;
            Ok(true)
        })
        .await
    }

    async fn delete_product(&self, product_id: ProductId, user_id: &UserId) -> Result<bool> {
        self.write(|tables| {
            if tables.owned_product(product_id, user_id).is_none() {
                return Ok(false);
            }
            tables.delete_product(product_id);
            Ok(true)
        })
        .await
    }

    // =========================================================================
    // Customization Operations
    // =========================================================================

    async fn get_product_customization(
        &self,
        product_id: ProductId,
        user_id: &UserId,
    ) -> Result<Option<ProductCustomization>> {
        Ok(self
            .read(|t| {
                t.owned_product(product_id, user_id)
                    .and_then(|_| t.customizations.get(&product_id).cloned())
            })
            .await)
    }

    async fn update_product_customization(
        &self,
        product_id: ProductId,
        user_id: &UserId,
        update: &CustomizationUpdate,
    ) -> Result<bool> {
        let now = Utc::now();
        self.write(|tables| {
            if tables.owned_product(product_id, user_id).is_none() {
                return Ok(false);
            }
            let Some(customization) = tables.customizations.get_mut(&product_id) else {
                return Ok(false);
            };
            customization.apply(update.clone(), now);
            Ok(true)
        })
        .await
    }

    // =========================================================================
    // Country Group Operations
    // =========================================================================

    async fn get_country_groups(
        &self,
        product_id: ProductId,
        user_id: &UserId,
    ) -> Result<Vec<CountryGroupWithDiscount>> {
        Ok(self
            .read(|t| {
                let owned = t.owned_product(product_id, user_id).is_some();
                t.sorted_groups()
                    .into_iter()
                    .map(|group| {
                        let mut countries: Vec<Country> = t
                            .countries
                            .iter()
                            .filter(|c| c.country_group_id == group.id)
                            .cloned()
                            .collect();
                        countries.sort_by(|a, b| a.name.cmp(&b.name));

                        let discount = t
                            .discounts
                            .get(&(group.id, product_id))
                            .filter(|_| owned)
                            .map(|d| GroupDiscount {
                                coupon: d.coupon.clone(),
                                discount_percentage: d.discount_percentage,
                            });

                        CountryGroupWithDiscount {
                            group: group.clone(),
                            countries,
                            discount,
                        }
                    })
                    .collect()
            })
            .await)
    }

    async fn insert_country_group_discount(&self, discount: &CountryGroupDiscount) -> Result<()> {
        self.write(|tables| {
            let key = (discount.country_group_id, discount.product_id);
            if !tables.country_groups.iter().any(|g| g.id == key.0) {
                return Err(StoreError::NotFound {
                    entity: "country group",
                    id: key.0.to_string(),
                });
            }
            if tables.product(key.1).is_none() {
                return Err(StoreError::NotFound {
                    entity: "product",
                    id: key.1.to_string(),
                });
            }
            if tables.discounts.contains_key(&key) {
                return Err(StoreError::Conflict(format!(
                    "discount already exists for country group {} and product {}",
                    key.0, key.1
                )));
            }
            tables.discounts.insert(key, discount.clone());
            Ok(())
        })
        .await
    }

    async fn update_country_discounts(
        &self,
        product_id: ProductId,
        user_id: &UserId,
        changes: &DiscountChanges,
    ) -> Result<bool> {
        self.transaction(|txn| {
            if txn.tables.owned_product(product_id, user_id).is_none() {
                return Ok(false);
            }

            for group_id in &changes.delete {
                txn.tables.discounts.remove(&(*group_id, product_id));
            }

            txn.checkpoint(FailPoint::UpdateDiscountsAfterDelete)?;

            for discount in &changes.upsert {
                let group_id = discount.country_group_id;
                if !txn.tables.country_groups.iter().any(|g| g.id == group_id) {
                    return Err(StoreError::NotFound {
                        entity: "country group",
                        id: group_id.to_string(),
                    });
                }
                txn.tables.discounts.insert(
                    (group_id, product_id),
                    CountryGroupDiscount {
                        product_id,
                        ..discount.clone()
                    },
                );
            }
            Ok(true)
        })
        .await
    }

    async fn sync_country_groups(&self, seeds: &[CountryGroupSeed]) -> Result<SyncSummary> {
        self.transaction(|txn| {
            let mut summary = SyncSummary::default();
            let mut group_ids = Vec::with_capacity(seeds.len());

            for seed in seeds {
                let groups = &mut txn.tables.country_groups;
                let id = match groups.iter().position(|g| g.name == seed.name) {
                    Some(index) => {
                        let group = &mut groups[index];
                        group.recommended_discount_percentage = seed.recommended_discount_percentage;
                        group.id
                    }
                    None => {
                        let id = CountryGroupId::generate();
                        groups.push(CountryGroup {
                            id,
                            name: seed.name.clone(),
                            recommended_discount_percentage: seed.recommended_discount_percentage,
                        });
                        id
                    }
                };
                group_ids.push(id);
                summary.country_groups += 1;
            }

            txn.checkpoint(FailPoint::SyncAfterGroups)?;

            for (seed, group_id) in seeds.iter().zip(group_ids) {
                for entry in &seed.countries {
                    let countries = &mut txn.tables.countries;
                    if countries
                        .iter()
                        .any(|c| c.name == entry.country_name && c.code != entry.country)
                    {
                        return Err(StoreError::Conflict(format!(
                            "country name already in use: {}",
                            entry.country_name
                        )));
                    }
                    match countries.iter().position(|c| c.code == entry.country) {
                        Some(index) => {
                            let country = &mut countries[index];
                            country.name.clone_from(&entry.country_name);
                            country.country_group_id = group_id;
                        }
                        None => countries.push(Country {
                            id: CountryId::generate(),
                            name: entry.country_name.clone(),
                            code: entry.country.clone(),
                            country_group_id: group_id,
                        }),
                    }
                    summary.countries += 1;
                }
            }

            Ok(summary)
        })
        .await
    }

    // =========================================================================
    // Banner & View Operations
    // =========================================================================

    async fn get_banner_target(
        &self,
        product_id: ProductId,
        url: &str,
        country_code: Option<&str>,
    ) -> Result<Option<BannerTarget>> {
        let url = normalize_url(url);
        let code = country_code.map(|c| c.trim().to_ascii_uppercase());

        Ok(self
            .read(|t| {
                let product = t.product(product_id).filter(|p| p.url == url)?.clone();
                let customization = t
                    .customizations
                    .get(&product.id)
                    .cloned()
                    .unwrap_or_else(|| {
                        ProductCustomization::defaults_for(product.id, product.created_at)
                    });
                let country = code
                    .and_then(|code| t.countries.iter().find(|c| c.code == code))
                    .cloned();
                let discount = country.as_ref().and_then(|c| {
                    t.discounts
                        .get(&(c.country_group_id, product.id))
                        .map(|d| GroupDiscount {
                            coupon: d.coupon.clone(),
                            discount_percentage: d.discount_percentage,
                        })
                });

                Some(BannerTarget {
                    product,
                    customization,
                    country,
                    discount,
                })
            })
            .await)
    }

    async fn record_product_view(
        &self,
        product_id: ProductId,
        country_id: Option<CountryId>,
        visited_at: DateTime<Utc>,
    ) -> Result<ProductView> {
        self.write(|tables| {
            if tables.product(product_id).is_none() {
                return Err(StoreError::NotFound {
                    entity: "product",
                    id: product_id.to_string(),
                });
            }
            if let Some(country_id) = country_id {
                if tables.country(country_id).is_none() {
                    return Err(StoreError::NotFound {
                        entity: "country",
                        id: country_id.to_string(),
                    });
                }
            }

            let view = ProductView {
                id: ProductViewId::generate(),
                product_id,
                country_id,
                visited_at,
            };
            tables.views.push(view.clone());
            Ok(view)
        })
        .await
    }

    async fn count_views_since(&self, user_id: &UserId, since: DateTime<Utc>) -> Result<u64> {
        let filter = ViewFilter::owner(user_id.clone()).since(since);
        Ok(self
            .read(|t| t.matching_views(&filter).count() as u64)
            .await)
    }

    async fn first_view_at(&self, filter: &ViewFilter) -> Result<Option<DateTime<Utc>>> {
        Ok(self
            .read(|t| t.matching_views(filter).map(|v| v.visited_at).min())
            .await)
    }

    async fn views_by_local_day(
        &self,
        filter: &ViewFilter,
        timezone: &DisplayTimezone,
    ) -> Result<Vec<(NaiveDate, u64)>> {
        let visits: Vec<DateTime<Utc>> = self
            .read(|t| t.matching_views(filter).map(|v| v.visited_at).collect())
            .await;

        let mut by_day: BTreeMap<NaiveDate, u64> = BTreeMap::new();
        for visited_at in visits {
            *by_day.entry(timezone.local_date(visited_at)?).or_default() += 1;
        }
        Ok(by_day.into_iter().collect())
    }

    async fn views_by_country(&self, filter: &ViewFilter) -> Result<Vec<CountryViews>> {
        Ok(self
            .read(|t| {
                let mut by_country: HashMap<CountryId, u64> = HashMap::new();
                for view in t.matching_views(filter) {
                    if let Some(country_id) = view.country_id {
                        *by_country.entry(country_id).or_default() += 1;
                    }
                }

                let mut rows: Vec<CountryViews> = by_country
                    .into_iter()
                    .filter_map(|(id, views)| {
                        t.country(id).map(|c| CountryViews {
                            country_code: c.code.clone(),
                            country_name: c.name.clone(),
                            views,
                        })
                    })
                    .collect();
                rows.sort_by(|a, b| {
                    b.views
                        .cmp(&a.views)
                        .then_with(|| a.country_name.cmp(&b.country_name))
                });
                rows
            })
            .await)
    }

    async fn views_by_country_group(&self, filter: &ViewFilter) -> Result<Vec<CountryGroupViews>> {
        Ok(self
            .read(|t| {
                let mut by_group: HashMap<CountryGroupId, u64> = HashMap::new();
                for view in t.matching_views(filter) {
                    if let Some(country) = view.country_id.and_then(|id| t.country(id)) {
                        *by_group.entry(country.country_group_id).or_default() += 1;
                    }
                }

                t.sorted_groups()
                    .into_iter()
                    .map(|group| CountryGroupViews {
                        country_group_name: group.name.clone(),
                        views: by_group.get(&group.id).copied().unwrap_or(0),
                    })
                    .collect()
            })
            .await)
    }
}
