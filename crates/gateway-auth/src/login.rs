//! Login orchestration tying together password verification, session
//! cookies, device-cookie bruteforce accounting, and CSRF issuance.

use chrono::{Duration, Utc};
use gateway_db::model::{Cookie, DeviceCookie, RemovalState, User};
use gateway_db::traits::{Cookies, UserLockout, Users};
use gateway_error::{ErrorCode, GatewayError};

use crate::device_cookie::{self, FailedLoginTracker};
use crate::password;
use crate::settings::BruteforceProtectionSettings;

/// Everything the login handler needs to set on the response: the session
/// cookie record, the resolved user, and optionally a freshly issued device
/// cookie (set when the client had none).
#[derive(Debug)]
pub struct LoginOutcome {
    pub user: User,
    pub session: Cookie,
    pub fresh_device_cookie: Option<String>,
}

/// Authenticates `{username, password}`, applying device-cookie bruteforce
/// accounting, and on success creates a session record with `session_ttl`.
///
/// `device_cookie_value` is the raw `DEVICE_COOKIE` the client presented, if
/// any. A missing or unverifiable cookie marks the client as untrusted for
/// this attempt: failures are counted by username alone and no lockout
/// record is checked against a nonce that doesn't exist.
#[allow(clippy::too_many_arguments)]
pub async fn login(
    users: &dyn Users,
    cookies: &dyn Cookies,
    lockout: &dyn UserLockout,
    tracker: &FailedLoginTracker,
    bfp: &BruteforceProtectionSettings,
    username: &str,
    password_attempt: &str,
    session_metadata: &str,
    session_ttl: Duration,
    device_cookie_value: Option<&str>,
) -> Result<LoginOutcome, GatewayError> {
    let trusted_device = device_cookie_value.and_then(|raw| device_cookie::verify(raw, &bfp.secret_key));

    if let Some(device) = &trusted_device {
        if lockout.has(device).await? {
            return Err(GatewayError::code(ErrorCode::DeviceCookieLockout));
        }
    }

    let login_failed = || GatewayError::code(ErrorCode::LoginFailed);

    let user = match users.get_by_name(username).await {
        Ok(user) if user.removal_state(Utc::now()) == RemovalState::Present => user,
        _ => {
            record_failure(tracker, lockout, bfp, username, trusted_device.as_ref()).await?;
            return Err(login_failed());
        }
    };

    if !password::verify_password(password_attempt, &user.password_hash)
        || !user.is_confirmed
        || user.is_disabled
    {
        record_failure(tracker, lockout, bfp, username, trusted_device.as_ref()).await?;
        return Err(login_failed());
    }

    let failure_key = trusted_device
        .as_ref()
        .map_or_else(|| username.to_string(), device_key);
    tracker.clear(&failure_key);

    let session = cookies.create(user.id, session_metadata, session_ttl).await?;

    let fresh_device_cookie = if trusted_device.is_none() {
        let device = DeviceCookie {
            username: username.to_string(),
            nonce: device_cookie::new_nonce(),
        };
        Some(device_cookie::sign(&device, &bfp.secret_key))
    } else {
        None
    };

    Ok(LoginOutcome {
        user,
        session,
        fresh_device_cookie,
    })
}

async fn record_failure(
    tracker: &FailedLoginTracker,
    lockout: &dyn UserLockout,
    bfp: &BruteforceProtectionSettings,
    username: &str,
    trusted_device: Option<&DeviceCookie>,
) -> Result<(), GatewayError> {
    let key = trusted_device.map_or_else(|| username.to_string(), device_key);
    let count = tracker.record_failure(&key, bfp.lockout_period_sec);

    if let Some(device) = trusted_device {
        if count > bfp.max_failed_logins {
            let expires_at = Utc::now() + Duration::seconds(bfp.lockout_period_sec);
            lockout.add(device, expires_at).await?;
        }
    }

    Ok(())
}

fn device_key(device: &DeviceCookie) -> String {
    format!("{}\x1f{}", device.username, device.nonce)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_db::fake::InMemoryDatabase;
    use gateway_db::Database;

    fn bfp() -> BruteforceProtectionSettings {
        BruteforceProtectionSettings {
            lockout_period_sec: 3600,
            max_failed_logins: 2,
            cleanup_interval_sec: 300,
            secret_key: "bfp-secret".to_string(),
        }
    }

    async fn seed_user(db: &InMemoryDatabase, name: &str, raw_password: &str) -> User {
        db.users()
            .create(
                name,
                name,
                &password::hash_password(raw_password).unwrap(),
                true,
                false,
                false,
                false,
                "user@example.com",
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn succeeds_with_correct_credentials() {
        let db = InMemoryDatabase::default();
        seed_user(&db, "alice", "hunter2").await;
        let tracker = FailedLoginTracker::default();

        let outcome = login(
            db.users(),
            db.cookies(),
            db.lockout(),
            &tracker,
            &bfp(),
            "alice",
            "hunter2",
            "{}",
            Duration::seconds(3600),
            None,
        )
        .await
        .unwrap();

        assert_eq!(outcome.user.name, "alice");
        assert!(outcome.fresh_device_cookie.is_some());
    }

    #[tokio::test]
    async fn wrong_password_never_reveals_which_field_was_wrong() {
        let db = InMemoryDatabase::default();
        seed_user(&db, "alice", "hunter2").await;
        let tracker = FailedLoginTracker::default();

        let err_unknown_user = login(
            db.users(),
            db.cookies(),
            db.lockout(),
            &tracker,
            &bfp(),
            "nobody",
            "whatever",
            "{}",
            Duration::seconds(3600),
            None,
        )
        .await
        .unwrap_err();
        let err_wrong_password = login(
            db.users(),
            db.cookies(),
            db.lockout(),
            &tracker,
            &bfp(),
            "alice",
            "wrong",
            "{}",
            Duration::seconds(3600),
            None,
        )
        .await
        .unwrap_err();

        assert_eq!(err_unknown_user.error_code().as_str(), "E_LOGIN_FAILED");
        assert_eq!(err_wrong_password.error_code().as_str(), "E_LOGIN_FAILED");
    }

    #[tokio::test]
    async fn untrusted_clients_are_never_locked_out_by_nonce() {
        let db = InMemoryDatabase::default();
        seed_user(&db, "alice", "hunter2").await;
        let tracker = FailedLoginTracker::default();

        for _ in 0..5 {
            let _ = login(
                db.users(),
                db.cookies(),
                db.lockout(),
                &tracker,
                &bfp(),
                "alice",
                "wrong",
                "{}",
                Duration::seconds(3600),
                None,
            )
            .await;
        }

        // No device cookie was ever presented, so no lockout row exists;
        // correct credentials still succeed.
        let outcome = login(
            db.users(),
            db.cookies(),
            db.lockout(),
            &tracker,
            &bfp(),
            "alice",
            "hunter2",
            "{}",
            Duration::seconds(3600),
            None,
        )
        .await
        .unwrap();
        assert_eq!(outcome.user.name, "alice");
    }

    #[tokio::test]
    async fn trusted_device_gets_locked_out_after_threshold() {
        let db = InMemoryDatabase::default();
        seed_user(&db, "alice", "hunter2").await;
        let tracker = FailedLoginTracker::default();

        let device = DeviceCookie {
            username: "alice".to_string(),
            nonce: device_cookie::new_nonce(),
        };
        let token = device_cookie::sign(&device, &bfp().secret_key);

        for _ in 0..3 {
            let _ = login(
                db.users(),
                db.cookies(),
                db.lockout(),
                &tracker,
                &bfp(),
                "alice",
                "wrong",
                "{}",
                Duration::seconds(3600),
                Some(&token),
            )
            .await;
        }

        let err = login(
            db.users(),
            db.cookies(),
            db.lockout(),
            &tracker,
            &bfp(),
            "alice",
            "hunter2",
            "{}",
            Duration::seconds(3600),
            Some(&token),
        )
        .await
        .unwrap_err();
        assert_eq!(err.error_code().as_str(), "E_DEVICE_COOKIE_LOCKOUT");
    }
}
