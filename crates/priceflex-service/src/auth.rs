//! Session authentication.
//!
//! Dashboard requests carry a Clerk session JWT, either as a bearer token or
//! in the `__session` cookie. Tokens are RS256-signed and validated against the
//! issuer's JWKS. Verification sits behind [`SessionVerifier`] so tests can
//! substitute their own.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::extract::{FromRequestParts, OriginalUri};
use axum::http::{header, request::Parts};
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use priceflex_core::UserId;

use crate::error::ApiError;
use crate::state::AppState;

// ============================================================================
// Constants
// ============================================================================

/// How long to cache JWKS keys before refreshing.
const JWKS_CACHE_DURATION: Duration = Duration::from_secs(3600); // 1 hour

/// Minimum time between refreshes triggered by an unknown `kid`.
const JWKS_MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Timeout for JWKS fetch requests.
const JWKS_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Cookie holding the Clerk session token.
pub const SESSION_COOKIE: &str = "__session";

/// Why a session could not be verified.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The token is malformed, expired, or not signed by the issuer.
    #[error("invalid session token: {0}")]
    InvalidToken(String),

    /// The issuer's signing keys could not be fetched.
    #[error("failed to fetch signing keys: {0}")]
    KeyFetch(String),
}

/// Verifies a session token and returns the user it belongs to.
#[async_trait]
pub trait SessionVerifier: Send + Sync {
    /// Verify `token`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` for tokens that do not verify and
    /// `AuthError::KeyFetch` if verification could not be attempted.
    async fn verify(&self, token: &str) -> Result<UserId, AuthError>;
}

// ============================================================================
// Extractor
// ============================================================================

/// An authenticated user extracted from a Clerk session token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The user ID (`sub` claim).
    pub user_id: UserId,
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut Parts,
        state: &'life1 Arc<AppState>,
    ) -> ::core::pin::Pin<
        Box<
            dyn ::core::future::Future<Output = Result<Self, Self::Rejection>>
                + ::core::marker::Send
                + 'async_trait,
        >,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            let sign_in = || ApiError::SignInRequired {
                location: sign_in_location(&state.config.sign_in_url, &request_target(parts)),
            };

            let Some(token) = session_token(parts) else {
                return Err(sign_in());
            };

            match state.verifier.verify(&token).await {
                Ok(user_id) => Ok(AuthUser { user_id }),
                Err(AuthError::InvalidToken(reason)) => {
                    tracing::debug!(reason = %reason, "Rejected session token");
                    Err(sign_in())
                }
                Err(AuthError::KeyFetch(msg)) => Err(ApiError::ExternalService(msg)),
            }
        })
    }
}

/// The session token from the `Authorization` header or the session cookie.
fn session_token(parts: &Parts) -> Option<String> {
    let bearer = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());

    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|cookie| cookie.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// Path and query of the request as the client sent it, before nesting.
fn request_target(parts: &Parts) -> String {
    let uri = parts
        .extensions
        .get::<OriginalUri>()
        .map_or(&parts.uri, |original| &original.0);

    uri.path_and_query()
        .map_or_else(|| uri.path().to_string(), ToString::to_string)
}

/// `{sign_in_url}?redirect_url={target}` with the target percent-encoded.
#[must_use]
pub fn sign_in_location(sign_in_url: &str, target: &str) -> String {
    let separator = if sign_in_url.contains('?') { '&' } else { '?' };
    format!(
        "{sign_in_url}{separator}redirect_url={}",
        encode_component(target)
    )
}

fn encode_component(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~') {
            encoded.push(char::from(byte));
        } else {
            let _ = write!(encoded, "%{byte:02X}");
        }
    }
    encoded
}

// ============================================================================
// JWKS Client and JWT Validation
// ============================================================================

/// JWT claims of a Clerk session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (user ID).
    pub sub: String,
    /// Issuer.
    pub iss: String,
    /// Expiration time.
    pub exp: i64,
    /// Session ID.
    #[serde(default)]
    pub sid: Option<String>,
}

/// JWKS (JSON Web Key Set) response structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Jwks {
    /// List of JWK keys.
    pub keys: Vec<Jwk>,
}

/// Single JSON Web Key.
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    /// Key type (e.g., "RSA").
    pub kty: String,
    /// Key ID.
    pub kid: Option<String>,
    /// Algorithm (e.g., "RS256").
    pub alg: Option<String>,
    /// RSA public key modulus (base64url encoded).
    pub n: Option<String>,
    /// RSA public key exponent (base64url encoded).
    pub e: Option<String>,
    /// Key use (e.g., "sig" for signature).
    #[serde(rename = "use")]
    pub key_use: Option<String>,
}

/// Cached decoding keys.
struct KeyCache {
    /// Cached keys mapped by kid.
    keys: HashMap<String, DecodingKey>,
    /// Default key (for tokens without kid).
    default_key: Option<DecodingKey>,
    /// When the keys were fetched; `None` until the first fetch.
    fetched_at: Option<Instant>,
}

impl KeyCache {
    fn is_expired(&self) -> bool {
        self.fetched_at
            .map_or(true, |at| at.elapsed() >= JWKS_CACHE_DURATION)
    }

    fn recently_fetched(&self) -> bool {
        self.fetched_at
            .is_some_and(|at| at.elapsed() < JWKS_MIN_REFRESH_INTERVAL)
    }

    fn get(&self, kid: Option<&str>) -> Option<DecodingKey> {
        match kid {
            Some(kid) => self.keys.get(kid).cloned(),
            None => self.default_key.clone(),
        }
    }
}

/// Validates Clerk session tokens against the issuer's JWKS.
pub struct JwksVerifier {
    /// Reusable HTTP client for JWKS fetches.
    client: reqwest::Client,
    issuer: String,
    audience: Option<String>,
    jwks_url: String,
    cache: RwLock<KeyCache>,
}

impl JwksVerifier {
    /// Create a verifier for `issuer`. The audience is checked only when set.
    #[must_use]
    pub fn new(issuer: &str, audience: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(JWKS_FETCH_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        let issuer = issuer.trim_end_matches('/').to_string();

        Self {
            client,
            jwks_url: format!("{issuer}/.well-known/jwks.json"),
            issuer,
            audience,
            cache: RwLock::new(KeyCache {
                keys: HashMap::new(),
                default_key: None,
                fetched_at: None,
            }),
        }
    }

    /// Validate a JWT and return its claims.
    ///
    /// # Errors
    ///
    /// Returns an `AuthError` if the token does not verify or the keys cannot
    /// be fetched.
    pub async fn validate(&self, token: &str) -> Result<SessionClaims, AuthError> {
        let header =
            decode_header(token).map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        let decoding_key = self.decoding_key(header.kid.as_deref()).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[&self.issuer]);
        match &self.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }

        let token_data = decode::<SessionClaims>(token, &decoding_key, &validation)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        Ok(token_data.claims)
    }

    /// Get a decoding key from cache or fetch from JWKS endpoint.
    async fn decoding_key(&self, kid: Option<&str>) -> Result<DecodingKey, AuthError> {
        {
            let cache = self.cache.read().await;
            if !cache.is_expired() {
                if let Some(key) = cache.get(kid) {
                    return Ok(key);
                }
                if cache.recently_fetched() {
                    return Err(AuthError::InvalidToken("unknown signing key".into()));
                }
            }
        }

        // Cache miss or expired; an unknown kid also forces a refresh so
        // rotated keys are picked up, at most once per refresh interval.
        let mut cache = self.cache.write().await;
        if !cache.is_expired() && cache.recently_fetched() {
            return cache
                .get(kid)
                .ok_or_else(|| AuthError::InvalidToken("unknown signing key".into()));
        }

        let jwks = self.fetch_jwks().await?;
        cache.keys.clear();
        cache.default_key = None;
        cache.fetched_at = Some(Instant::now());

        for jwk in &jwks.keys {
            if let Some(decoding_key) = jwk_to_decoding_key(jwk) {
                if let Some(ref key_kid) = jwk.kid {
                    cache.keys.insert(key_kid.clone(), decoding_key.clone());
                }
                if cache.default_key.is_none() {
                    cache.default_key = Some(decoding_key);
                }
            }
        }

        cache
            .get(kid)
            .ok_or_else(|| AuthError::InvalidToken("unknown signing key".into()))
    }

    /// Fetch JWKS from the issuer.
    async fn fetch_jwks(&self) -> Result<Jwks, AuthError> {
        tracing::debug!(url = %self.jwks_url, "Fetching JWKS");

        let response = self.client.get(&self.jwks_url).send().await.map_err(|e| {
            tracing::error!(error = %e, url = %self.jwks_url, "Failed to fetch JWKS");
            AuthError::KeyFetch("Failed to fetch authentication keys".into())
        })?;

        if !response.status().is_success() {
            tracing::error!(
                status = %response.status(),
                url = %self.jwks_url,
                "JWKS fetch returned non-success status"
            );
            return Err(AuthError::KeyFetch(
                "Failed to fetch authentication keys".into(),
            ));
        }

        let jwks: Jwks = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to parse JWKS response");
            AuthError::KeyFetch("Failed to parse authentication keys".into())
        })?;

        tracing::info!(keys_count = %jwks.keys.len(), "JWKS fetched successfully");

        Ok(jwks)
    }
}

#[async_trait]
impl SessionVerifier for JwksVerifier {
    async fn verify(&self, token: &str) -> Result<UserId, AuthError> {
        let claims = self.validate(token).await?;
        claims
            .sub
            .parse()
            .map_err(|e: priceflex_core::IdError| AuthError::InvalidToken(e.to_string()))
    }
}

/// Convert a JWK to a `DecodingKey`.
fn jwk_to_decoding_key(jwk: &Jwk) -> Option<DecodingKey> {
    if jwk.kty != "RSA" {
        tracing::debug!(kty = %jwk.kty, "Skipping non-RSA JWK");
        return None;
    }

    let n = jwk.n.as_ref()?;
    let e = jwk.e.as_ref()?;

    DecodingKey::from_rsa_components(n, e).ok()
}
