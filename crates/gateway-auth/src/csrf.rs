//! Signed CSRF double-submit tokens bound to `{user_id, issued_at}`.

use std::time::{SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use gateway_error::{ErrorCode, GatewayError};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

/// Issues a CSRF token for `user_id`, valid for `ttl_seconds` from now. The
/// same string is written to both the `CSRF_TOKEN` cookie and the
/// `X-CSRF-TOKEN` header by the caller.
#[must_use]
pub fn issue(user_id: Uuid, secret: &str) -> String {
    let issued_at = now_secs();
    let payload = URL_SAFE_NO_PAD.encode(format!("{user_id}\x1f{issued_at}"));
    let signature = mac_for(&payload, secret);
    format!("{payload}.{signature}")
}

/// Verifies a token against the signing secret, the caller's current
/// `user_id`, and `ttl_seconds` expiry, returning the specific CSRF error
/// code for the first condition that fails.
pub fn verify(
    token: &str,
    secret: &str,
    current_user_id: Uuid,
    ttl_seconds: i64,
) -> Result<(), GatewayError> {
    let (payload, signature) = token
        .split_once('.')
        .ok_or_else(|| GatewayError::code(ErrorCode::CsrfTokenInvalid))?;

    let expected = mac_for(payload, secret);
    if !bool::from(expected.as_bytes().ct_eq(signature.as_bytes())) {
        return Err(GatewayError::code(ErrorCode::CsrfTokenInvalid));
    }

    let decoded = URL_SAFE_NO_PAD
        .decode(payload)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .ok_or_else(|| GatewayError::code(ErrorCode::CsrfTokenInvalid))?;
    let (bound_user, issued_at) = decoded
        .split_once('\x1f')
        .ok_or_else(|| GatewayError::code(ErrorCode::CsrfTokenInvalid))?;
    let issued_at: i64 = issued_at
        .parse()
        .map_err(|_| GatewayError::code(ErrorCode::CsrfTokenInvalid))?;

    if now_secs() - issued_at > ttl_seconds {
        return Err(GatewayError::code(ErrorCode::CsrfTokenInvalid));
    }

    let bound_user: Uuid = bound_user
        .parse()
        .map_err(|_| GatewayError::code(ErrorCode::CsrfTokenInvalid))?;
    if bound_user != current_user_id {
        return Err(GatewayError::code(ErrorCode::CsrfTokenUserMismatch));
    }

    Ok(())
}

/// Compares the cookie and header values of the double-submit pair.
#[must_use]
pub fn matches(cookie_value: &str, header_value: &str) -> bool {
    bool::from(cookie_value.as_bytes().ct_eq(header_value.as_bytes()))
}

fn mac_for(payload: &str, secret: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts a key of any length");
    mac.update(payload.as_bytes());
    URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issues_and_verifies_a_token() {
        let user_id = Uuid::new_v4();
        let token = issue(user_id, "csrf-secret");
        assert!(verify(&token, "csrf-secret", user_id, 3600).is_ok());
    }

    #[test]
    fn rejects_expired_tokens() {
        let user_id = Uuid::new_v4();
        let token = issue(user_id, "csrf-secret");
        let err = verify(&token, "csrf-secret", user_id, -1).unwrap_err();
        assert_eq!(err.error_code().as_str(), "E_CSRF_TOKEN_INVALID");
    }

    #[test]
    fn rejects_a_token_bound_to_a_different_user() {
        let token = issue(Uuid::new_v4(), "csrf-secret");
        let err = verify(&token, "csrf-secret", Uuid::new_v4(), 3600).unwrap_err();
        assert_eq!(err.error_code().as_str(), "E_CSRF_TOKEN_USER_MISMATCH");
    }

    #[test]
    fn double_submit_values_must_match() {
        assert!(matches("abc", "abc"));
        assert!(!matches("abc", "abd"));
    }
}
