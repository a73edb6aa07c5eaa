//! Signed `DEVICE_COOKIE` tokens and the in-memory failed-login counters that
//! drive bruteforce lockout.

use std::time::{SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use dashmap::DashMap;
use gateway_db::model::DeviceCookie;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Generates a fresh random nonce for a device cookie.
#[must_use]
pub fn new_nonce() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Signs `{username, nonce}` into the `DEVICE_COOKIE` value, `payload.signature`.
#[must_use]
pub fn sign(cookie: &DeviceCookie, secret: &str) -> String {
    let payload = URL_SAFE_NO_PAD.encode(format!("{}\x1f{}", cookie.username, cookie.nonce));
    let signature = mac_for(&payload, secret);
    format!("{payload}.{signature}")
}

/// Verifies a `DEVICE_COOKIE` value produced by [`sign`]. Returns `None` for
/// any malformed, unsigned, or tampered token; the caller treats that client
/// as untrusted rather than surfacing a distinct error.
#[must_use]
pub fn verify(token: &str, secret: &str) -> Option<DeviceCookie> {
    let (payload, signature) = token.split_once('.')?;
    let expected = mac_for(payload, secret);
    if !bool::from(expected.as_bytes().ct_eq(signature.as_bytes())) {
        return None;
    }
    let decoded = URL_SAFE_NO_PAD.decode(payload).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, nonce) = decoded.split_once('\x1f')?;
    Some(DeviceCookie {
        username: username.to_string(),
        nonce: nonce.to_string(),
    })
}

fn mac_for(payload: &str, secret: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts a key of any length");
    mac.update(payload.as_bytes());
    URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

struct Window {
    count: u32,
    window_start: u64,
}

/// Sliding-window failed-login counter keyed by `(username, nonce)` for
/// trusted devices, or by username alone for untrusted ones. Purely a
/// process-local accounting aid; the authoritative lockout record lives in
/// [`gateway_db::traits::UserLockout`].
#[derive(Default)]
pub struct FailedLoginTracker {
    windows: DashMap<String, Window>,
}

impl FailedLoginTracker {
    /// Records one failed attempt for `key` and returns the count within the
    /// current `window_secs`-wide sliding window.
    pub fn record_failure(&self, key: &str, window_secs: i64) -> u32 {
        let now = now_secs();
        let window_secs = window_secs.max(0) as u64;
        let mut entry = self
            .windows
            .entry(key.to_string())
            .or_insert(Window {
                count: 0,
                window_start: now,
            });
        if now.saturating_sub(entry.window_start) >= window_secs {
            entry.count = 0;
            entry.window_start = now;
        }
        entry.count += 1;
        entry.count
    }

    /// Clears the counter for `key`, called on a successful login from a
    /// trusted device.
    pub fn clear(&self, key: &str) {
        self.windows.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signs_and_verifies_a_round_trip() {
        let cookie = DeviceCookie {
            username: "alice".to_string(),
            nonce: new_nonce(),
        };
        let token = sign(&cookie, "super-secret");
        let verified = verify(&token, "super-secret").unwrap();
        assert_eq!(verified.username, cookie.username);
        assert_eq!(verified.nonce, cookie.nonce);
    }

    #[test]
    fn rejects_a_tampered_token() {
        let cookie = DeviceCookie {
            username: "alice".to_string(),
            nonce: new_nonce(),
        };
        let token = sign(&cookie, "super-secret");
        let tampered = token.replace("alice", "mallory");
        assert!(verify(&tampered, "super-secret").is_none());
    }

    #[test]
    fn rejects_wrong_secret() {
        let cookie = DeviceCookie {
            username: "alice".to_string(),
            nonce: new_nonce(),
        };
        let token = sign(&cookie, "secret-a");
        assert!(verify(&token, "secret-b").is_none());
    }

    #[test]
    fn tracker_counts_within_window_and_resets_after() {
        let tracker = FailedLoginTracker::default();
        assert_eq!(tracker.record_failure("alice", 3600), 1);
        assert_eq!(tracker.record_failure("alice", 3600), 2);
        tracker.clear("alice");
        assert_eq!(tracker.record_failure("alice", 3600), 1);
    }
}
