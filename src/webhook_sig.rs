//! Shared HMAC-SHA256 webhook signature scheme (spec §6, §4.2): used for the
//! scrape-trigger webhook, the CRM webhook, and outgoing webhook delivery.
//! Signing string is `timestamp + "." + body`; comparison is timing-safe;
//! timestamps outside a 5-minute window are rejected to defeat replay.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const REPLAY_WINDOW_SECS: i64 = 300;

/// Compute the hex-encoded HMAC-SHA256 signature for `timestamp_ms.body` under `secret`.
pub fn sign(secret: &str, timestamp_ms: i64, body: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(timestamp_ms.to_string().as_bytes());
    mac.update(b".");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Verify a signature in constant time, and check the timestamp is within
/// `REPLAY_WINDOW_SECS` of `now_ms`.
pub fn verify(
    secret: &str,
    timestamp_ms: i64,
    body: &[u8],
    signature_hex: &str,
    now_ms: i64,
) -> bool {
    if (now_ms - timestamp_ms).abs() > REPLAY_WINDOW_SECS * 1000 {
        return false;
    }
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(timestamp_ms.to_string().as_bytes());
    mac.update(b".");
    mac.update(body);
    let Ok(expected) = hex::decode(signature_hex) else {
        return false;
    };
    mac.verify_slice(&expected).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_signature_within_window_verifies() {
        let now_ms = 1_700_000_000_000;
        let sig = sign("secret", now_ms, b"{\"a\":1}");
        assert!(verify("secret", now_ms, b"{\"a\":1}", &sig, now_ms + 1000));
    }

    #[test]
    fn stale_timestamp_is_rejected() {
        let now_ms = 1_700_000_000_000;
        let sig = sign("secret", now_ms, b"{\"a\":1}");
        let six_minutes_later = now_ms + 6 * 60 * 1000;
        assert!(!verify(
            "secret",
            now_ms,
            b"{\"a\":1}",
            &sig,
            six_minutes_later
        ));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let now_ms = 1_700_000_000_000;
        let sig = sign("secret", now_ms, b"{\"a\":1}");
        assert!(!verify("wrong", now_ms, b"{\"a\":1}", &sig, now_ms));
    }

    #[test]
    fn tampered_body_is_rejected() {
        let now_ms = 1_700_000_000_000;
        let sig = sign("secret", now_ms, b"{\"a\":1}");
        assert!(!verify("secret", now_ms, b"{\"a\":2}", &sig, now_ms));
    }
}
