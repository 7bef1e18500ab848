//! Database schema.
//!
//! The SQL lives in `migrations/`. Column names (including the historical
//! `dicount_percentage`) and defaults are fixed by existing deployments.

use sqlx::migrate::Migrator;

/// Migrations embedded at compile time.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");
