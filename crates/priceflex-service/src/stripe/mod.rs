//! Stripe webhook verification and event payloads.
//!
//! Only the webhook side of Stripe is used: events arrive signed with the
//! endpoint secret and carry subscription objects. Nothing here calls the
//! Stripe API.

pub mod types;

pub use types::{Event, EventData, Price, Subscription, SubscriptionItem, SubscriptionItems};

use crate::crypto::{check_timestamp, constant_time_eq, hmac_sha256_hex, SignatureError};

/// Name of the signature header.
pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// Verify a `stripe-signature` header against the raw payload.
///
/// The header has the form `t=timestamp,v1=signature[,v1=signature...]`. Any
/// `v1` entry may match; other schemes are ignored.
///
/// # Errors
///
/// Returns a `SignatureError` if the header is malformed, the timestamp is
/// stale, or no signature matches.
pub fn verify_signature(
    payload: &str,
    header: &str,
    secret: &str,
    now: i64,
) -> Result<(), SignatureError> {
    let mut timestamp: Option<&str> = None;
    let mut signatures: Vec<&str> = Vec::new();

    for part in header.split(',') {
        let mut kv = part.trim().splitn(2, '=');
        match (kv.next(), kv.next()) {
            (Some("t"), Some(ts)) => timestamp = Some(ts),
            (Some("v1"), Some(sig)) => signatures.push(sig),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::Malformed("missing timestamp"))?;
    let seconds: i64 = timestamp
        .parse()
        .map_err(|_| SignatureError::Malformed("timestamp is not a number"))?;

    if signatures.is_empty() {
        return Err(SignatureError::Malformed("no v1 signature"));
    }

    check_timestamp(seconds, now)?;

    let expected = hmac_sha256_hex(secret, &format!("{timestamp}.{payload}"));
    if signatures.iter().any(|sig| constant_time_eq(&expected, sig)) {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

/// Build a `stripe-signature` header for `payload`.
#[must_use]
pub fn sign(payload: &str, secret: &str, timestamp: i64) -> String {
    let signature = hmac_sha256_hex(secret, &format!("{timestamp}.{payload}"));
    format!("t={timestamp},v1={signature}")
}
