//! Cryptographic utilities for webhook verification.
//!
//! Stripe signs webhooks with a hex-encoded HMAC-SHA256 keyed by the raw
//! secret. Clerk delivers webhooks through Svix, which signs with a
//! base64-encoded HMAC-SHA256 keyed by the base64-decoded secret.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// How far a signed timestamp may drift from the current time, in seconds.
pub const SIGNATURE_TOLERANCE_SECS: i64 = 5 * 60;

/// Why a webhook signature was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    /// A signature header is absent.
    #[error("missing signature header: {0}")]
    MissingHeader(&'static str),

    /// A signature header or the secret cannot be parsed.
    #[error("malformed signature: {0}")]
    Malformed(&'static str),

    /// The signed timestamp is outside the tolerance window.
    #[error("signature timestamp outside tolerance")]
    Expired,

    /// No signature matched the payload.
    #[error("signature mismatch")]
    Mismatch,
}

/// Compute HMAC-SHA256.
///
/// # Panics
///
/// This function will never panic in practice. The `expect` call is guarded by
/// the invariant that HMAC-SHA256 accepts keys of any size per RFC 2104.
#[must_use]
pub fn hmac_sha256(key: &[u8], message: &[u8]) -> Vec<u8> {
    // INVARIANT: HMAC-SHA256 accepts keys of any size per RFC 2104, so
    // `new_from_slice` only fails if the Hmac implementation is broken.
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC-SHA256 accepts any key size");
    mac.update(message);
    mac.finalize().into_bytes().to_vec()
}

/// Compute HMAC-SHA256 and return the hex-encoded result (64 characters).
#[must_use]
pub fn hmac_sha256_hex(secret: &str, message: &str) -> String {
    hex::encode(hmac_sha256(secret.as_bytes(), message.as_bytes()))
}

/// Compute HMAC-SHA256 and return the standard base64-encoded result.
#[must_use]
pub fn hmac_sha256_base64(key: &[u8], message: &str) -> String {
    STANDARD.encode(hmac_sha256(key, message.as_bytes()))
}

/// Decode a standard base64 string.
///
/// # Errors
///
/// Returns `SignatureError::Malformed` if `value` is not valid base64.
pub fn decode_base64(value: &str) -> Result<Vec<u8>, SignatureError> {
    STANDARD
        .decode(value)
        .map_err(|_| SignatureError::Malformed("invalid base64"))
}

/// Check that a signed unix timestamp is within tolerance of `now`.
///
/// # Errors
///
/// Returns `SignatureError::Expired` if the timestamp drifted too far.
pub fn check_timestamp(timestamp: i64, now: i64) -> Result<(), SignatureError> {
    if now.abs_diff(timestamp) > SIGNATURE_TOLERANCE_SECS.unsigned_abs() {
        return Err(SignatureError::Expired);
    }
    Ok(())
}

/// Constant-time string comparison to prevent timing attacks.
#[must_use]
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hmac_sha256_hex_matches_known_vector() {
        // RFC 4231 test case 2.
        assert_eq!(
            hmac_sha256_hex("Jefe", "what do ya want for nothing?"),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn hmac_sha256_base64_matches_hex() {
        let hex_sig = hmac_sha256_hex("secret", "message");
        let b64_sig = hmac_sha256_base64(b"secret", "message");
        assert_eq!(hex::encode(decode_base64(&b64_sig).unwrap()), hex_sig);
    }

    #[test]
    fn timestamps_outside_tolerance_are_rejected() {
        assert!(check_timestamp(1_000, 1_000 + SIGNATURE_TOLERANCE_SECS).is_ok());
        assert_eq!(
            check_timestamp(1_000, 1_001 + SIGNATURE_TOLERANCE_SECS),
            Err(SignatureError::Expired)
        );
        assert_eq!(
            check_timestamp(1_001 + SIGNATURE_TOLERANCE_SECS, 1_000),
            Err(SignatureError::Expired)
        );
    }

    #[test]
    fn extreme_timestamps_are_expired() {
        assert_eq!(check_timestamp(i64::MIN, 1_000), Err(SignatureError::Expired));
        assert_eq!(check_timestamp(i64::MAX, -1_000), Err(SignatureError::Expired));
        assert_eq!(check_timestamp(i64::MIN, i64::MAX), Err(SignatureError::Expired));
    }

    #[test]
    fn invalid_base64_is_malformed() {
        assert!(matches!(
            decode_base64("not base64!"),
            Err(SignatureError::Malformed(_))
        ));
    }

    #[test]
    fn constant_time_eq_compares_strings() {
        assert!(constant_time_eq("abc", "abc"));
        assert!(constant_time_eq("", ""));
        assert!(!constant_time_eq("abc", "abd"));
        assert!(!constant_time_eq("abc", "ab"));
        assert!(!constant_time_eq("abc", "ABC"));
    }
}
