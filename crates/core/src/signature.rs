//! HMAC-SHA256 signing of hook trigger payloads.
//!
//! Callers sign the raw request body with the shared hook secret and send
//! the result as `sha256=<hex>`. Verification is constant-time.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::CoreError;

type HmacSha256 = Hmac<Sha256>;

/// Prefix of the signature header value.
pub const SIGNATURE_PREFIX: &str = "sha256=";

/// Compute the `sha256=<hex>` signature of `payload` under `secret`.
pub fn sign_payload(secret: &str, payload: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(payload);
    format!("{SIGNATURE_PREFIX}{}", hex::encode(mac.finalize().into_bytes()))
}

/// Verify a `sha256=<hex>` signature header against `payload`.
///
/// A missing prefix, malformed hex, or digest mismatch all yield
/// [`CoreError::Unauthorized`].
pub fn verify_signature(secret: &str, payload: &[u8], header: &str) -> Result<(), CoreError> {
    let hex_digest = header
        .trim()
        .strip_prefix(SIGNATURE_PREFIX)
        .ok_or_else(|| CoreError::Unauthorized("unsupported signature scheme".to_string()))?;
    let expected = hex::decode(hex_digest)
        .ok_or_else(|| CoreError::Unauthorized("malformed signature".to_string()))?;

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(payload);
    mac.verify_slice(&expected)
        .map_err(|_| CoreError::Unauthorized("signature mismatch".to_string()))
}

// ---------------------------------------------------------------------------
// hex helpers
// ---------------------------------------------------------------------------

mod hex {
    /// Encode bytes as a lowercase hex string.
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Decode a hex string (either case). `None` on odd length or bad digits.
    pub fn decode(s: &str) -> Option<Vec<u8>> {
        if s.len() % 2 != 0 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(s.get(i..i + 2)?, 16).ok())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
