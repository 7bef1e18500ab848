//! Error types for PriceFlex.

use crate::ids::IdError;

/// Result type for PriceFlex core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised while validating or interpreting domain values.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoreError {
    /// A field failed validation.
    #[error("invalid {field}: {message}")]
    Validation {
        /// The offending field.
        field: &'static str,
        /// What was wrong with it.
        message: String,
    },

    /// Invalid identifier.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] IdError),

    /// Unknown subscription tier name.
    #[error("unknown tier: {0}")]
    UnknownTier(String),

    /// Unknown or unsupported IANA timezone.
    #[error("unknown timezone: {0}")]
    UnknownTimezone(String),

    /// A date fell outside the supported calendar range.
    #[error("date out of range: {0}")]
    DateOutOfRange(String),
}

impl CoreError {
    /// Shorthand for a validation error on `field`.
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }
}
