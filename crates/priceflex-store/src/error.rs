//! Error types for PriceFlex storage.

use priceflex_core::CoreError;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// A stored value could not be decoded into a domain type.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A referenced record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of record.
        entity: &'static str,
        /// Identifier that was looked up.
        id: String,
    },

    /// A unique or primary key constraint was violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Applying migrations failed.
    #[error("migration error: {0}")]
    Migration(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if db.is_unique_violation() {
                return Self::Conflict(db.message().to_string());
            }
            if db.is_foreign_key_violation() {
                return Self::NotFound {
                    entity: "referenced row",
                    id: db.constraint().unwrap_or_default().to_string(),
                };
            }
        }
        Self::Database(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        Self::Migration(err.to_string())
    }
}

impl From<CoreError> for StoreError {
    fn from(err: CoreError) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
