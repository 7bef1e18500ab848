//! Identifier types for PriceFlex.
//!
//! Row identifiers are UUIDs generated by the database. User identifiers are
//! opaque strings issued by the identity provider (e.g. `user_2abc...`).
//!
//! # Macro-based ID Types
//!
//! The `uuid_id_type!` macro reduces boilerplate for UUID-based identifier types,
//! ensuring consistent implementation of serialization, parsing, and display traits.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Longest user identifier accepted from the identity provider.
const MAX_USER_ID_LEN: usize = 255;

/// Macro to define a UUID-based identifier type with standard trait implementations.
///
/// This macro generates a newtype wrapper around `uuid::Uuid` with implementations for:
/// - `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - `Serialize`, `Deserialize` (as string)
/// - `FromStr`, `Display`, `Debug`
/// - `TryFrom<String>`, `Into<String>`
macro_rules! uuid_id_type {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(uuid::Uuid);

        impl $name {
            /// Create a new identifier from a UUID.
            #[must_use]
            pub const fn from_uuid(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }

            /// Generate a new random identifier.
            #[must_use]
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4())
            }

            /// Return the underlying UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> &uuid::Uuid {
                &self.0
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let uuid = uuid::Uuid::parse_str(s).map_err(|_| IdError::InvalidUuid)?;
                Ok(Self(uuid))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0.to_string()
            }
        }

        impl From<uuid::Uuid> for $name {
            fn from(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }
        }
    };
}

uuid_id_type!(ProductId, "A product identifier (`products.id`).");
uuid_id_type!(CountryId, "A country identifier (`countries.id`).");
uuid_id_type!(CountryGroupId, "A country group identifier (`country_groups.id`).");
uuid_id_type!(SubscriptionId, "A subscription row identifier (`user_subscription.id`).");
uuid_id_type!(ProductViewId, "A product view event identifier (`product_views.id`).");

/// A user identifier issued by the identity provider.
///
/// Stored in `clerk_user_id` columns. The value is opaque: it is only trimmed
/// and checked for length.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Return the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for UserId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(IdError::EmptyUserId);
        }
        if trimmed.len() > MAX_USER_ID_LEN || trimmed.chars().any(char::is_whitespace) {
            return Err(IdError::InvalidUserId);
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl fmt::Debug for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserId({})", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for UserId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Errors that can occur when parsing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    /// The input is not a valid UUID.
    #[error("invalid UUID format")]
    InvalidUuid,

    /// The user identifier is empty.
    #[error("user id must not be empty")]
    EmptyUserId,

    /// The user identifier contains whitespace or is too long.
    #[error("invalid user id")]
    InvalidUserId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_id_roundtrip() {
        let id = ProductId::generate();
        let parsed = ProductId::from_str(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn product_id_rejects_garbage() {
        assert_eq!(ProductId::from_str("not-a-uuid"), Err(IdError::InvalidUuid));
    }

    #[test]
    fn user_id_is_trimmed() {
        let id: UserId = "  user_2abc  ".parse().unwrap();
        assert_eq!(id.as_str(), "user_2abc");
    }

    #[test]
    fn user_id_rejects_empty_and_whitespace() {
        assert_eq!("   ".parse::<UserId>(), Err(IdError::EmptyUserId));
        assert_eq!("user 2abc".parse::<UserId>(), Err(IdError::InvalidUserId));
        assert_eq!(
            "u".repeat(MAX_USER_ID_LEN + 1).parse::<UserId>(),
            Err(IdError::InvalidUserId)
        );
    }

    #[test]
    fn user_id_serde_json() {
        let id: UserId = "user_2abc".parse().unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"user_2abc\"");
        let parsed: UserId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, parsed);
    }
}
