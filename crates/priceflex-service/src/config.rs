//! Service configuration.

use priceflex_core::Tier;

/// Errors raised while reading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required variable is unset or empty.
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    /// A variable is set to a value that cannot be used.
    #[error("invalid value for {var}: {message}")]
    Invalid {
        /// The variable name.
        var: &'static str,
        /// What was wrong with it.
        message: String,
    },
}

/// Stripe price IDs of the paid tiers.
#[derive(Debug, Clone, Default)]
pub struct StripePriceIds {
    /// Price ID of the Basic plan.
    pub basic: Option<String>,
    /// Price ID of the Standard plan.
    pub standard: Option<String>,
    /// Price ID of the Premium plan.
    pub premium: Option<String>,
}

impl StripePriceIds {
    /// The tier a Stripe price belongs to, if it is one of ours.
    #[must_use]
    pub fn tier_for(&self, price_id: &str) -> Option<Tier> {
        [
            (Tier::Basic, &self.basic),
            (Tier::Standard, &self.standard),
            (Tier::Premium, &self.premium),
        ]
        .into_iter()
        .find(|(_, id)| id.as_deref() == Some(price_id))
        .map(|(tier, _)| tier)
    }
}

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// PostgreSQL connection URL.
    pub database_url: String,

    /// Maximum pool connections (default: 10).
    pub database_max_connections: u32,

    /// Clerk issuer URL; JWKS is fetched from `{issuer}/.well-known/jwks.json`.
    pub clerk_issuer: String,

    /// Expected JWT audience, checked only when set.
    pub clerk_audience: Option<String>,

    /// Svix signing secret for Clerk webhooks (`whsec_...`).
    pub clerk_webhook_secret: Option<String>,

    /// Stripe webhook signing secret.
    pub stripe_webhook_secret: Option<String>,

    /// Stripe price IDs of the paid tiers.
    pub stripe_price_ids: StripePriceIds,

    /// Where unauthenticated dashboard requests are sent (default: "/sign-in").
    pub sign_in_url: String,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,

    /// Header carrying the visitor's ISO country code (default: "x-country-code").
    pub country_header: String,

    /// Country code forced for every banner request in local development.
    pub test_country_code: Option<String>,

    /// Upsert the bundled country groups on startup.
    pub sync_country_groups: bool,
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if a required variable is missing or a value
    /// does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source. Empty values count
    /// as unset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if a required variable is missing or a value
    /// does not parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        let database_url = var("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        if !(database_url.starts_with("postgres://") || database_url.starts_with("postgresql://"))
        {
            return Err(ConfigError::Invalid {
                var: "DATABASE_URL",
                message: "expected a postgres:// URL".into(),
            });
        }

        let clerk_issuer = var("CLERK_ISSUER")
            .ok_or(ConfigError::Missing("CLERK_ISSUER"))?
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            listen_addr: var("LISTEN_ADDR").unwrap_or(defaults.listen_addr),
            database_url,
            database_max_connections: parse(
                "DATABASE_MAX_CONNECTIONS",
                var("DATABASE_MAX_CONNECTIONS"),
            )?
            .unwrap_or(defaults.database_max_connections),
            clerk_issuer,
            clerk_audience: var("CLERK_AUDIENCE"),
            clerk_webhook_secret: var("CLERK_WEBHOOK_SECRET"),
            stripe_webhook_secret: var("STRIPE_WEBHOOK_SECRET"),
            stripe_price_ids: StripePriceIds {
                basic: var("STRIPE_BASIC_PLAN_PRICE_ID"),
                standard: var("STRIPE_STANDARD_PLAN_PRICE_ID"),
                premium: var("STRIPE_PREMIUM_PLAN_PRICE_ID"),
            },
            sign_in_url: var("SIGN_IN_URL").unwrap_or(defaults.sign_in_url),
            cors_origins: var("CORS_ORIGINS").map_or(defaults.cors_origins, |origins| {
                origins
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            }),
            max_body_bytes: parse("MAX_BODY_BYTES", var("MAX_BODY_BYTES"))?
                .unwrap_or(defaults.max_body_bytes),
            request_timeout_seconds: parse(
                "REQUEST_TIMEOUT_SECONDS",
                var("REQUEST_TIMEOUT_SECONDS"),
            )?
            .unwrap_or(defaults.request_timeout_seconds),
            country_header: var("COUNTRY_HEADER")
                .map_or(defaults.country_header, |h| h.to_ascii_lowercase()),
            test_country_code: var("TEST_COUNTRY_CODE").map(|c| c.to_ascii_uppercase()),
            sync_country_groups: parse_bool("SYNC_COUNTRY_GROUPS", var("SYNC_COUNTRY_GROUPS"))?
                .unwrap_or(defaults.sync_country_groups),
        })
    }
}

fn parse<T>(var: &'static str, value: Option<String>) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .map(|v| {
            v.parse().map_err(|e: T::Err| ConfigError::Invalid {
                var,
                message: e.to_string(),
            })
        })
        .transpose()
}

fn parse_bool(var: &'static str, value: Option<String>) -> Result<Option<bool>, ConfigError> {
    value
        .map(|v| match v.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid {
                var,
                message: format!("expected a boolean, got {v:?}"),
            }),
        })
        .transpose()
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            database_url: "postgres://localhost/priceflex".into(),
            database_max_connections: 10,
            clerk_issuer: "https://clerk.example.com".into(),
            clerk_audience: None,
            clerk_webhook_secret: None,
            stripe_webhook_secret: None,
            stripe_price_ids: StripePriceIds::default(),
            sign_in_url: "/sign-in".into(),
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 30,
            country_header: "x-country-code".into(),
            test_country_code: None,
            sync_country_groups: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<ServiceConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ServiceConfig::from_lookup(|name| vars.get(name).cloned())
    }

    const REQUIRED: [(&str, &str); 2] = [
        ("DATABASE_URL", "postgres://localhost/priceflex"),
        ("CLERK_ISSUER", "https://clerk.example.com/"),
    ];

    #[test]
    fn defaults_apply_when_only_required_vars_are_set() {
        let config = load(&REQUIRED).unwrap();
        assert_eq!(config.listen_addr, "0.0.0.0:8080");
        assert_eq!(config.database_max_connections, 10);
        assert_eq!(config.clerk_issuer, "https://clerk.example.com");
        assert_eq!(config.sign_in_url, "/sign-in");
        assert_eq!(config.cors_origins, vec!["*".to_string()]);
        assert_eq!(config.country_header, "x-country-code");
        assert!(!config.sync_country_groups);
    }

    #[test]
    fn empty_strings_count_as_unset() {
        let config = load(&[
            REQUIRED[0],
            REQUIRED[1],
            ("CLERK_WEBHOOK_SECRET", ""),
            ("LISTEN_ADDR", "  "),
        ])
        .unwrap();
        assert!(config.clerk_webhook_secret.is_none());
        assert_eq!(config.listen_addr, "0.0.0.0:8080");
    }

    #[test]
    fn missing_database_url_is_an_error() {
        assert!(matches!(
            load(&[REQUIRED[1]]),
            Err(ConfigError::Missing("DATABASE_URL"))
        ));
    }

    #[test]
    fn non_postgres_database_url_is_rejected() {
        let err = load(&[("DATABASE_URL", "mysql://db"), REQUIRED[1]]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                var: "DATABASE_URL",
                ..
            }
        ));
    }

    #[test]
    fn invalid_numbers_are_rejected() {
        let err = load(&[REQUIRED[0], REQUIRED[1], ("MAX_BODY_BYTES", "lots")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                var: "MAX_BODY_BYTES",
                ..
            }
        ));
    }

    #[test]
    fn parses_lists_and_flags() {
        let config = load(&[
            REQUIRED[0],
            REQUIRED[1],
            ("CORS_ORIGINS", "https://a.com, https://b.com"),
            ("SYNC_COUNTRY_GROUPS", "true"),
            ("TEST_COUNTRY_CODE", "in"),
        ])
        .unwrap();
        assert_eq!(config.cors_origins, vec!["https://a.com", "https://b.com"]);
        assert!(config.sync_country_groups);
        assert_eq!(config.test_country_code.as_deref(), Some("IN"));
    }

    #[test]
    fn price_ids_resolve_to_tiers() {
        let ids = StripePriceIds {
            basic: Some("price_basic".into()),
            standard: Some("price_standard".into()),
            premium: None,
        };
        assert_eq!(ids.tier_for("price_standard"), Some(Tier::Standard));
        assert_eq!(ids.tier_for("price_basic"), Some(Tier::Basic));
        assert_eq!(ids.tier_for("price_other"), None);
    }
}
