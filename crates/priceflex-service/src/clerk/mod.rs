//! Clerk webhook verification and event payloads.
//!
//! Clerk delivers webhooks through Svix. Each request carries `svix-id`,
//! `svix-timestamp` and `svix-signature` headers; the signature is an
//! HMAC-SHA256 of `"{id}.{timestamp}.{body}"` keyed by the base64 part of the
//! `whsec_` secret.

use serde::Deserialize;

use crate::crypto::{
    check_timestamp, constant_time_eq, decode_base64, hmac_sha256_base64, SignatureError,
};

/// Message ID header.
pub const ID_HEADER: &str = "svix-id";
/// Timestamp header (unix seconds).
pub const TIMESTAMP_HEADER: &str = "svix-timestamp";
/// Signature list header.
pub const SIGNATURE_HEADER: &str = "svix-signature";

const SECRET_PREFIX: &str = "whsec_";

/// Svix signature headers of one delivery.
#[derive(Debug, Clone, Copy)]
pub struct SvixHeaders<'a> {
    /// `svix-id`.
    pub id: &'a str,
    /// `svix-timestamp`.
    pub timestamp: &'a str,
    /// `svix-signature`: space-separated `v1,<base64>` entries.
    pub signature: &'a str,
}

fn secret_key(secret: &str) -> Result<Vec<u8>, SignatureError> {
    decode_base64(secret.strip_prefix(SECRET_PREFIX).unwrap_or(secret))
}

/// Verify a Svix-signed payload.
///
/// # Errors
///
/// Returns a `SignatureError` if the secret or headers are malformed, the
/// timestamp is stale, or no `v1` signature matches.
pub fn verify_signature(
    payload: &str,
    headers: SvixHeaders<'_>,
    secret: &str,
    now: i64,
) -> Result<(), SignatureError> {
    let key = secret_key(secret)?;
    let seconds: i64 = headers
        .timestamp
        .trim()
        .parse()
        .map_err(|_| SignatureError::Malformed("timestamp is not a number"))?;

    check_timestamp(seconds, now)?;

    let expected = hmac_sha256_base64(
        &key,
        &format!("{}.{}.{payload}", headers.id, headers.timestamp.trim()),
    );

    let matched = headers
        .signature
        .split_whitespace()
        .filter_map(|entry| entry.strip_prefix("v1,"))
        .any(|sig| constant_time_eq(&expected, sig));

    if matched {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

/// Build a `v1,<base64>` signature for `payload`.
///
/// # Errors
///
/// Returns `SignatureError::Malformed` if the secret is not valid base64.
pub fn sign(
    payload: &str,
    id: &str,
    timestamp: i64,
    secret: &str,
) -> Result<String, SignatureError> {
    let key = secret_key(secret)?;
    let signature = hmac_sha256_base64(&key, &format!("{id}.{timestamp}.{payload}"));
    Ok(format!("v1,{signature}"))
}

/// Clerk webhook event.
#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    /// Event type, e.g. `user.created`.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Event data; for user events this is the user object.
    pub data: EventUser,
}

/// The user object of a user event. Only the ID is used.
#[derive(Debug, Clone, Deserialize)]
pub struct EventUser {
    /// Clerk user ID.
    #[serde(default)]
    pub id: Option<String>,
}
