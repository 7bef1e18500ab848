//! PostgreSQL storage implementation.
//!
//! This module provides the `PgStore` implementation of the `Store` trait.
//! Multi-statement operations run inside a single transaction.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;

use priceflex_core::{
    normalize_url, BillingUpdate, Country, CountryGroup, CountryGroupDiscount, CountryGroupSeed,
    CountryGroupViews, CountryGroupWithDiscount, CountryId, CountryViews, CustomizationUpdate,
    DiscountChanges, DisplayTimezone, NewUserSubscription, Product, ProductCustomization,
    ProductDetails, ProductId, ProductView, SyncSummary, UserId, UserSubscription, ViewFilter,
};

use crate::error::Result;
use crate::models::{
    count, narrow, CountryGroupRow, CountryGroupViewsRow, CountryRow, CountryViewsRow,
    CustomizationRow, DailyCountRow, DiscountRow, ProductRow, ProductViewRow, SubscriptionRow,
};
use crate::schema::MIGRATOR;
use crate::{BannerTarget, DeletedUser, Store};

/// PostgreSQL-backed storage implementation.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wrap an existing connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect to the database at `database_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool cannot be created.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Apply pending migrations.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Migration` if a migration fails.
    pub async fn migrate(&self) -> Result<()> {
        MIGRATOR.run(&self.pool).await?;
        info!("Database migrations applied");
        Ok(())
    }

    /// The underlying connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply a billing update to the row matched by `key_column = key`.
    async fn update_subscription(
        &self,
        key_column: &'static str,
        key: &str,
        update: &BillingUpdate,
    ) -> Result<bool> {
        let sql = format!(
            r#"
            UPDATE user_subscription SET
                tier = COALESCE($2::tier, tier),
                stripe_customer_id = CASE WHEN $3 THEN $4 ELSE stripe_customer_id END,
                stripe_subscription_id = CASE WHEN $5 THEN $6 ELSE stripe_subscription_id END,
                stripe_subscription_item_id =
                    CASE WHEN $7 THEN $8 ELSE stripe_subscription_item_id END,
                updated_at = now()
            WHERE {key_column} = $1
            "#
        );

        let result = sqlx::query(&sql)
            .bind(key)
            .bind(update.tier.map(|tier| tier.as_str()))
            .bind(update.stripe_customer_id.is_some())
            .bind(update.stripe_customer_id.clone().flatten())
            .bind(update.stripe_subscription_id.is_some())
            .bind(update.stripe_subscription_id.clone().flatten())
            .bind(update.stripe_subscription_item_id.is_some())
            .bind(update.stripe_subscription_item_id.clone().flatten())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Insert a product and its default customization inside `tx`.
async fn insert_product(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    user_id: &UserId,
    details: &ProductDetails,
) -> Result<Product> {
    let row = sqlx::query_as::<_, ProductRow>(
        r#"
        INSERT INTO products (clerk_user_id, name, url, description)
        VALUES ($1, $2, $3, $4)
        RETURNING id, clerk_user_id, name, url, description, created_at, updated_at
        "#,
    )
    .bind(user_id.as_str())
    .bind(&details.name)
    .bind(&details.url)
    .bind(&details.description)
    .fetch_one(&mut **tx)
    .await?;

    sqlx::query("INSERT INTO product_customizations (product_id) VALUES ($1)")
        .bind(row.id)
        .execute(&mut **tx)
        .await?;

    Product::try_from(row)
}

#[async_trait]
impl Store for PgStore {
    // =========================================================================
    // Subscription Operations
    // =========================================================================

    async fn create_user_subscription(&self, subscription: &NewUserSubscription) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO user_subscription (clerk_user_id, tier)
            VALUES ($1, $2::tier)
            ON CONFLICT (clerk_user_id) DO NOTHING
            "#,
        )
        .bind(subscription.user_id.as_str())
        .bind(subscription.tier.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn get_user_subscription(&self, user_id: &UserId) -> Result<Option<UserSubscription>> {
        sqlx::query_as::<_, SubscriptionRow>(
            r#"
            SELECT id, clerk_user_id, stripe_subscription_item_id, stripe_subscription_id,
                   tier::text AS tier, stripe_customer_id, created_at, updated_at
            FROM user_subscription
            WHERE clerk_user_id = $1
            "#,
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await?
        .map(UserSubscription::try_from)
        .transpose()
    }

    async fn update_subscription_by_user(
        &self,
        user_id: &UserId,
        update: &BillingUpdate,
    ) -> Result<bool> {
        self.update_subscription("clerk_user_id", user_id.as_str(), update)
            .await
    }

    async fn update_subscription_by_customer(
        &self,
        stripe_customer_id: &str,
        update: &BillingUpdate,
    ) -> Result<bool> {
        self.update_subscription("stripe_customer_id", stripe_customer_id, update)
            .await
    }

    async fn delete_user(&self, user_id: &UserId) -> Result<DeletedUser> {
        let mut tx = self.pool.begin().await?;

        let subscriptions = sqlx::query("DELETE FROM user_subscription WHERE clerk_user_id = $1")
            .bind(user_id.as_str())
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let products = sqlx::query("DELETE FROM products WHERE clerk_user_id = $1")
            .bind(user_id.as_str())
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;

        debug!(user_id = %user_id, subscriptions, products, "Deleted user data");
        Ok(DeletedUser {
            subscriptions,
            products,
        })
    }

    // =========================================================================
    // Product Operations
    // =========================================================================

    async fn get_products(&self, user_id: &UserId, limit: Option<usize>) -> Result<Vec<Product>> {
        let limit = limit.map(|l| i64::try_from(l).unwrap_or(i64::MAX));

        sqlx::query_as::<_, ProductRow>(
            r#"
            SELECT id, clerk_user_id, name, url, description, created_at, updated_at
            FROM products
            WHERE clerk_user_id = $1
            ORDER BY created_at DESC, id
            LIMIT $2
            "#,
        )
        .bind(user_id.as_str())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(Product::try_from)
        .collect()
    }

    async fn count_products(&self, user_id: &UserId) -> Result<u64> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE clerk_user_id = $1")
                .bind(user_id.as_str())
                .fetch_one(&self.pool)
                .await?;

        Ok(count(total))
    }

    async fn get_product(
        &self,
        product_id: ProductId,
        user_id: &UserId,
    ) -> Result<Option<Product>> {
        sqlx::query_as::<_, ProductRow>(
            r#"
            SELECT id, clerk_user_id, name, url, description, created_at, updated_at
            FROM products
            WHERE id = $1 AND clerk_user_id = $2
            "#,
        )
        .bind(product_id.as_uuid())
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await?
        .map(Product::try_from)
        .transpose()
    }

    async fn create_product(&self, user_id: &UserId, details: &ProductDetails) -> Result<Product> {
        let mut tx = self.pool.begin().await?;
        let product = insert_product(&mut tx, user_id, details).await?;
        tx.commit().await?;

        Ok(product)
    }

    async fn create_product_within_limit(
        &self,
        user_id: &UserId,
        details: &ProductDetails,
        max_products: u64,
    ) -> Result<Option<Product>> {
        let mut tx = self.pool.begin().await?;

        // Held until commit; serializes product creation for this user.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(user_id.as_str())
            .execute(&mut *tx)
            .await?;

        let existing: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE clerk_user_id = $1")
                .bind(user_id.as_str())
                .fetch_one(&mut *tx)
                .await?;
        if count(existing) >= max_products {
            debug!(user_id = %user_id, existing, "Product limit reached");
            return Ok(None);
        }

        let product = insert_product(&mut tx, user_id, details).await?;
        tx.commit().await?;

        Ok(Some(product))
    }

    async fn update_product(
        &self,
        product_id: ProductId,
        user_id: &UserId,
        details: &ProductDetails,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET name = $3, url = $4, description = $5, updated_at = now()
            WHERE id = $1 AND clerk_user_id = $2
            "#,
        )
        .bind(product_id.as_uuid())
        .bind(user_id.as_str())
        .bind(&details.name)
        .bind(&details.url)
        .bind(&details.description)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_product(&self, product_id: ProductId, user_id: &UserId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1 AND clerk_user_id = $2")
            .bind(product_id.as_uuid())
            .bind(user_id.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    // Customization Operations
    // =========================================================================

    async fn get_product_customization(
        &self,
        product_id: ProductId,
        user_id: &UserId,
    ) -> Result<Option<ProductCustomization>> {
        let row = sqlx::query_as::<_, CustomizationRow>(
            r#"
            SELECT pc.product_id, pc.class_prefix, pc.location_message, pc.background_color,
                   pc.text_color, pc.font_size, pc.banner_container, pc.is_sticky,
                   pc.created_at, pc.updated_at
            FROM product_customizations pc
            JOIN products p ON p.id = pc.product_id
            WHERE pc.product_id = $1 AND p.clerk_user_id = $2
            "#,
        )
        .bind(product_id.as_uuid())
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn update_product_customization(
        &self,
        product_id: ProductId,
        user_id: &UserId,
        update: &CustomizationUpdate,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE product_customizations pc
            SET class_prefix = $3, location_message = $4, background_color = $5,
                text_color = $6, font_size = $7, banner_container = $8, is_sticky = $9,
                updated_at = now()
            FROM products p
            WHERE pc.product_id = p.id AND p.id = $1 AND p.clerk_user_id = $2
            "#,
        )
        .bind(product_id.as_uuid())
        .bind(user_id.as_str())
        .bind(&update.class_prefix)
        .bind(&update.location_message)
        .bind(&update.background_color)
        .bind(&update.text_color)
        .bind(&update.font_size)
        .bind(&update.banner_container)
        .bind(update.is_sticky)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    // Country Group Operations
    // =========================================================================

    async fn get_country_groups(
        &self,
        product_id: ProductId,
        user_id: &UserId,
    ) -> Result<Vec<CountryGroupWithDiscount>> {
        let groups = sqlx::query_as::<_, CountryGroupRow>(
            r#"
            SELECT id, name, recommended_discount_percentage
            FROM country_groups
            ORDER BY recommended_discount_percentage DESC NULLS LAST, name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let countries = sqlx::query_as::<_, CountryRow>(
            "SELECT id, name, code, country_group_id FROM countries ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        let discounts = sqlx::query_as::<_, DiscountRow>(
            r#"
            SELECT d.country_group_id, d.product_id, d.coupon,
                   d.dicount_percentage AS discount_percentage
            FROM country_group_discounts d
            JOIN products p ON p.id = d.product_id
            WHERE d.product_id = $1 AND p.clerk_user_id = $2
            "#,
        )
        .bind(product_id.as_uuid())
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        let mut countries_by_group: HashMap<Uuid, Vec<Country>> = HashMap::new();
        for row in countries {
            countries_by_group
                .entry(row.country_group_id)
                .or_default()
                .push(row.into());
        }
        let mut discount_by_group: HashMap<Uuid, DiscountRow> = discounts
            .into_iter()
            .map(|row| (row.country_group_id, row))
            .collect();

        Ok(groups
            .into_iter()
            .map(|row| {
                let id = row.id;
                CountryGroupWithDiscount {
                    group: CountryGroup::from(row),
                    countries: countries_by_group.remove(&id).unwrap_or_default(),
                    discount: discount_by_group.remove(&id).map(Into::into),
                }
            })
            .collect())
    }

    async fn insert_country_group_discount(&self, discount: &CountryGroupDiscount) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO country_group_discounts
                (country_group_id, product_id, coupon, dicount_percentage)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(discount.country_group_id.as_uuid())
        .bind(discount.product_id.as_uuid())
        .bind(&discount.coupon)
        .bind(narrow(discount.discount_percentage))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_country_discounts(
        &self,
        product_id: ProductId,
        user_id: &UserId,
        changes: &DiscountChanges,
    ) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let owned = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM products WHERE id = $1 AND clerk_user_id = $2",
        )
        .bind(product_id.as_uuid())
        .bind(user_id.as_str())
        .fetch_optional(&mut *tx)
        .await?;
        if owned.is_none() {
            return Ok(false);
        }

        if !changes.delete.is_empty() {
            let groups: Vec<Uuid> = changes.delete.iter().map(|id| *id.as_uuid()).collect();
            sqlx::query(
                r#"
                DELETE FROM country_group_discounts
                WHERE product_id = $1 AND country_group_id = ANY($2)
                "#,
            )
            .bind(product_id.as_uuid())
            .bind(groups)
            .execute(&mut *tx)
            .await?;
        }

        for discount in &changes.upsert {
            sqlx::query(
                r#"
                INSERT INTO country_group_discounts
                    (country_group_id, product_id, coupon, dicount_percentage)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (country_group_id, product_id) DO UPDATE
                SET coupon = excluded.coupon,
                    dicount_percentage = excluded.dicount_percentage,
                    updated_at = now()
                "#,
            )
            .bind(discount.country_group_id.as_uuid())
            .bind(product_id.as_uuid())
            .bind(&discount.coupon)
            .bind(narrow(discount.discount_percentage))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn sync_country_groups(&self, seeds: &[CountryGroupSeed]) -> Result<SyncSummary> {
        let mut tx = self.pool.begin().await?;
        let mut summary = SyncSummary::default();

        for seed in seeds {
            let group_id: Uuid = sqlx::query_scalar(
                r#"
                INSERT INTO country_groups (name, recommended_discount_percentage)
                VALUES ($1, $2)
                ON CONFLICT (name) DO UPDATE
                SET recommended_discount_percentage = excluded.recommended_discount_percentage,
                    updated_at = now()
                RETURNING id
                "#,
            )
            .bind(&seed.name)
            .bind(seed.recommended_discount_percentage.map(narrow))
            .fetch_one(&mut *tx)
            .await?;
            summary.country_groups += 1;

            for country in &seed.countries {
                sqlx::query(
                    r#"
                    INSERT INTO countries (name, code, country_group_id)
                    VALUES ($1, $2, $3)
                    ON CONFLICT (code) DO UPDATE
                    SET name = excluded.name,
                        country_group_id = excluded.country_group_id,
                        updated_at = now()
                    "#,
                )
                .bind(&country.country_name)
                .bind(&country.country)
                .bind(group_id)
                .execute(&mut *tx)
                .await?;
                summary.countries += 1;
            }
        }

        tx.commit().await?;
        info!(
            country_groups = summary.country_groups,
            countries = summary.countries,
            "Synchronised country groups"
        );
        Ok(summary)
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
        let Some(row) = sqlx::query_as::<_, ProductRow>(
            r#"
            SELECT id, clerk_user_id, name, url, description, created_at, updated_at
            FROM products
            WHERE id = $1 AND url = $2
            "#,
        )
        .bind(product_id.as_uuid())
        .bind(normalize_url(url))
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };
        let product = Product::try_from(row)?;

        let customization = sqlx::query_as::<_, CustomizationRow>(
            r#"
            SELECT product_id, class_prefix, location_message, background_color, text_color,
                   font_size, banner_container, is_sticky, created_at, updated_at
            FROM product_customizations
            WHERE product_id = $1
            "#,
        )
        .bind(product.id.as_uuid())
        .fetch_optional(&self.pool)
        .await?
        .map_or_else(
            || ProductCustomization::defaults_for(product.id, product.created_at),
            ProductCustomization::from,
        );

        let country = match country_code {
            Some(code) => sqlx::query_as::<_, CountryRow>(
                "SELECT id, name, code, country_group_id FROM countries WHERE code = $1",
            )
            .bind(code.trim().to_ascii_uppercase())
            .fetch_optional(&self.pool)
            .await?
            .map(Country::from),
            None => None,
        };

        let discount = match &country {
            Some(country) => sqlx::query_as::<_, DiscountRow>(
                r#"
                SELECT country_group_id, product_id, coupon,
                       dicount_percentage AS discount_percentage
                FROM country_group_discounts
                WHERE product_id = $1 AND country_group_id = $2
                "#,
            )
            .bind(product.id.as_uuid())
            .bind(country.country_group_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .map(Into::into),
            None => None,
        };

        Ok(Some(BannerTarget {
            product,
            customization,
            country,
            discount,
        }))
    }

    async fn record_product_view(
        &self,
        product_id: ProductId,
        country_id: Option<CountryId>,
        visited_at: DateTime<Utc>,
    ) -> Result<ProductView> {
        let row = sqlx::query_as::<_, ProductViewRow>(
            r#"
            INSERT INTO product_views (product_id, country_id, visited_at)
            VALUES ($1, $2, $3)
            RETURNING id, product_id, country_id, visited_at
            "#,
        )
        .bind(product_id.as_uuid())
        .bind(country_id.map(|id| *id.as_uuid()))
        .bind(visited_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn count_views_since(&self, user_id: &UserId, since: DateTime<Utc>) -> Result<u64> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM product_views pv
            JOIN products p ON p.id = pv.product_id
            WHERE p.clerk_user_id = $1 AND pv.visited_at >= $2
            "#,
        )
        .bind(user_id.as_str())
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        Ok(count(total))
    }

    async fn first_view_at(&self, filter: &ViewFilter) -> Result<Option<DateTime<Utc>>> {
        let first: Option<DateTime<Utc>> = sqlx::query_scalar(
            r#"
            SELECT MIN(pv.visited_at)
            FROM product_views pv
            JOIN products p ON p.id = pv.product_id
            WHERE p.clerk_user_id = $1
              AND ($2::uuid IS NULL OR pv.product_id = $2)
              AND ($3::timestamptz IS NULL OR pv.visited_at >= $3)
            "#,
        )
        .bind(filter.owner.as_str())
        .bind(filter.product_id.map(|id| *id.as_uuid()))
        .bind(filter.since)
        .fetch_one(&self.pool)
        .await?;

        Ok(first)
    }

    async fn views_by_local_day(
        &self,
        filter: &ViewFilter,
        timezone: &DisplayTimezone,
    ) -> Result<Vec<(NaiveDate, u64)>> {
        let rows = sqlx::query_as::<_, DailyCountRow>(
            r#"
            SELECT (pv.visited_at AT TIME ZONE $4)::date AS day, COUNT(*) AS views
            FROM product_views pv
            JOIN products p ON p.id = pv.product_id
            WHERE p.clerk_user_id = $1
              AND ($2::uuid IS NULL OR pv.product_id = $2)
              AND ($3::timestamptz IS NULL OR pv.visited_at >= $3)
            GROUP BY day
            ORDER BY day
            "#,
        )
        .bind(filter.owner.as_str())
        .bind(filter.product_id.map(|id| *id.as_uuid()))
        .bind(filter.since)
        .bind(timezone.name())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| (row.day, count(row.views)))
            .collect())
    }

    async fn views_by_country(&self, filter: &ViewFilter) -> Result<Vec<CountryViews>> {
        let rows = sqlx::query_as::<_, CountryViewsRow>(
            r#"
            SELECT c.code AS country_code, c.name AS country_name, COUNT(*) AS views
            FROM product_views pv
            JOIN products p ON p.id = pv.product_id
            JOIN countries c ON c.id = pv.country_id
            WHERE p.clerk_user_id = $1
              AND ($2::uuid IS NULL OR pv.product_id = $2)
              AND ($3::timestamptz IS NULL OR pv.visited_at >= $3)
            GROUP BY c.code, c.name
            ORDER BY views DESC, c.name
            "#,
        )
        .bind(filter.owner.as_str())
        .bind(filter.product_id.map(|id| *id.as_uuid()))
        .bind(filter.since)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn views_by_country_group(&self, filter: &ViewFilter) -> Result<Vec<CountryGroupViews>> {
        let rows = sqlx::query_as::<_, CountryGroupViewsRow>(
            r#"
            SELECT cg.name AS country_group_name, COUNT(v.id) AS views
            FROM country_groups cg
            LEFT JOIN countries c ON c.country_group_id = cg.id
            LEFT JOIN (
                SELECT pv.id, pv.country_id
                FROM product_views pv
                JOIN products p ON p.id = pv.product_id
                WHERE p.clerk_user_id = $1
                  AND ($2::uuid IS NULL OR pv.product_id = $2)
                  AND ($3::timestamptz IS NULL OR pv.visited_at >= $3)
            ) v ON v.country_id = c.id
            GROUP BY cg.id, cg.name, cg.recommended_discount_percentage
            ORDER BY cg.recommended_discount_percentage DESC NULLS LAST, cg.name
            "#,
        )
        .bind(filter.owner.as_str())
        .bind(filter.product_id.map(|id| *id.as_uuid()))
        .bind(filter.since)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}
