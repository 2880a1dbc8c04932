// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook signature verification.
//!
//! Providers sign the raw request body with HMAC-SHA256; the hex digest
//! arrives in a header. Comparison is constant-time. A provider without a
//! configured secret skips verification.

use ring::hmac;

/// Verify a hex-encoded HMAC-SHA256 signature over `body`.
///
/// Returns `true` when `secret` is `None` (verification disabled).
pub fn verify_signature(secret: Option<&str>, body: &[u8], signature: Option<&str>) -> bool {
    let Some(secret) = secret else {
        return true;
    };
    let Some(signature) = signature else {
        return false;
    };
    let Some(sig_bytes) = decode_hex(signature) else {
        return false;
    };

    let key = hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes());
    hmac::verify(&key, body, &sig_bytes).is_ok()
}

fn decode_hex(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).ok())
        .collect()
}
