//! HMAC-SHA256 signatures used by the gateway.

use hmac::{Hmac, Mac};
use sha2::Sha256;

/// Hex-encoded HMAC-SHA256 of `message` under `secret`.
#[must_use]
pub fn hmac_sha256_hex(secret: &str, message: &[u8]) -> String {
    // HMAC accepts keys of any length, so this never fails.
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret.as_bytes()) else {
        return String::new();
    };
    mac.update(message);
    hex::encode(mac.finalize().into_bytes())
}

/// Whether `signature` is the HMAC of `message` under `secret`.
#[must_use]
pub fn verify(secret: &str, message: &[u8], signature: &str) -> bool {
    let expected = hmac_sha256_hex(secret, message);
    !expected.is_empty() && constant_time_compare(&expected, signature.trim())
}

/// Message signed by the checkout widget on success.
#[must_use]
pub fn checkout_message(gateway_order_id: &str, payment_id: &str) -> String {
    format!("{gateway_order_id}|{payment_id}")
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}
