//! `/login`, `/logout`, `/security/csrf-token`.

use axum::extract::State;
use axum::http::header::{HeaderValue, SET_COOKIE};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use chrono::Duration;
use gateway_auth::csrf;
use gateway_error::GatewayError;
use serde::{Deserialize, Serialize};

use crate::middleware::session::CurrentUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub session_metadata: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: uuid::Uuid,
    pub name: String,
    pub is_admin: bool,
}

fn set_cookie(name: &str, value: &str, secure: bool, max_age: i64) -> HeaderValue {
    let secure_flag = if secure { "; Secure" } else { "" };
    HeaderValue::from_str(&format!(
        "{name}={value}; HttpOnly; Path=/; Max-Age={max_age}{secure_flag}"
    ))
    .expect("cookie value contains no control characters")
}

/// Logs in, sets `SESSION_ID`/`USER_ID`/`DEVICE_COOKIE` cookies, and issues a
/// fresh CSRF token in both the `CSRF_TOKEN` cookie and `X-CSRF-TOKEN`
/// header.
pub async fn login(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
    Json(body): Json<LoginRequest>,
) -> Result<Response, GatewayError> {
    let device_cookie = headers
        .get(axum::http::header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|raw| {
            raw.split(';').find_map(|pair| {
                let (k, v) = pair.trim().split_once('=')?;
                (k == "DEVICE_COOKIE").then(|| v.to_string())
            })
        });

    let outcome = gateway_auth::login(
        state.db.users(),
        state.db.cookies(),
        state.db.lockout(),
        &state.failed_logins,
        &state.config.bruteforce_protection,
        &body.username,
        &body.password,
        &body.session_metadata,
        Duration::seconds(state.config.cookie.expiration_seconds),
        device_cookie.as_deref(),
    )
    .await?;

    let secure = state.config.cookie.secure;
    let csrf_token = csrf::issue(outcome.user.id, &state.config.csrf_protection.secret_key);

    let mut response = (
        StatusCode::OK,
        Json(LoginResponse {
            user_id: outcome.user.id,
            name: outcome.user.name.clone(),
            is_admin: outcome.user.is_admin,
        }),
    )
        .into_response();

    let jar = response.headers_mut();
    jar.append(
        SET_COOKIE,
        set_cookie("SESSION_ID", &outcome.session.id.to_string(), secure, state.config.cookie.expiration_seconds),
    );
    jar.append(
        SET_COOKIE,
        set_cookie("USER_ID", &outcome.user.id.to_string(), secure, state.config.cookie.expiration_seconds),
    );
    jar.append(
        SET_COOKIE,
        set_cookie(
            "CSRF_TOKEN",
            &csrf_token,
            secure,
            state.config.csrf_protection.token_exp_seconds,
        ),
    );
    if let Some(device) = outcome.fresh_device_cookie {
        jar.append(SET_COOKIE, set_cookie("DEVICE_COOKIE", &device, secure, 365 * 24 * 3600));
    }
    jar.insert(
        "X-CSRF-TOKEN",
        HeaderValue::from_str(&csrf_token).expect("csrf token is ASCII"),
    );

    Ok(response)
}

/// Deletes the session record and clears the session/CSRF cookies.
pub async fn logout(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
    Extension(current): Extension<CurrentUser>,
) -> Result<Response, GatewayError> {
    if let Some(session_id) = headers
        .get(axum::http::header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|raw| {
            raw.split(';').find_map(|pair| {
                let (k, v) = pair.trim().split_once('=')?;
                (k == "SESSION_ID").then(|| v.to_string())
            })
        })
        .and_then(|raw| raw.parse::<uuid::Uuid>().ok())
    {
        if let Ok(session) = state.db.cookies().get(session_id, Some(current.0.id)).await {
            state.db.cookies().delete(&session).await?;
        }
    }

    let mut response = StatusCode::OK.into_response();
    let jar = response.headers_mut();
    for name in ["SESSION_ID", "USER_ID", "CSRF_TOKEN"] {
        jar.append(
            SET_COOKIE,
            HeaderValue::from_str(&format!("{name}=; HttpOnly; Path=/; Max-Age=0"))
                .expect("static cookie clear string"),
        );
    }
    Ok(response)
}

#[derive(Debug, Serialize)]
pub struct CsrfTokenResponse {
    pub csrf_token: String,
}

/// Issues a fresh CSRF token for the current session, exempt from the CSRF
/// middleware itself (it's how a client gets a token in the first place).
pub async fn refresh_csrf_token(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Response, GatewayError> {
    let token = csrf::issue(current.0.id, &state.config.csrf_protection.secret_key);
    let mut response = (StatusCode::OK, Json(CsrfTokenResponse { csrf_token: token.clone() })).into_response();
    let jar = response.headers_mut();
    jar.append(
        SET_COOKIE,
        set_cookie(
            "CSRF_TOKEN",
            &token,
            state.config.cookie.secure,
            state.config.csrf_protection.token_exp_seconds,
        ),
    );
    jar.insert("X-CSRF-TOKEN", HeaderValue::from_str(&token).expect("csrf token is ASCII"));
    Ok(response)
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderMap;

    use super::*;
    use crate::test_support::test_state;

    #[tokio::test]
    async fn login_sets_session_and_csrf_cookies() {
        let state = test_state();
        let hash = gateway_auth::password::hash_password("hunter22").unwrap();
        state
            .db
            .users()
            .create("alice", "Alice", &hash, true, false, false, false, "alice@example.test")
            .await
            .unwrap();

        let response = login(
            State(state),
            HeaderMap::new(),
            Json(LoginRequest { username: "alice".into(), password: "hunter22".into(), session_metadata: "ua".into() }),
        )
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let cookies: Vec<_> = response.headers().get_all(SET_COOKIE).iter().collect();
        assert!(cookies.iter().any(|c| c.to_str().unwrap().starts_with("SESSION_ID=")));
        assert!(cookies.iter().any(|c| c.to_str().unwrap().starts_with("CSRF_TOKEN=")));
        assert!(response.headers().contains_key("X-CSRF-TOKEN"));
    }

    #[tokio::test]
    async fn login_rejects_wrong_password() {
        let state = test_state();
        let hash = gateway_auth::password::hash_password("hunter22").unwrap();
        state
            .db
            .users()
            .create("alice", "Alice", &hash, true, false, false, false, "alice@example.test")
            .await
            .unwrap();

        let err = login(
            State(state),
            HeaderMap::new(),
            Json(LoginRequest { username: "alice".into(), password: "wrong".into(), session_metadata: "ua".into() }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.error_code().as_str(), "E_LOGIN_FAILED");
    }

    #[tokio::test]
    async fn refresh_csrf_token_issues_fresh_token() {
        let state = test_state();
        let user = state
            .db
            .users()
            .create("alice", "Alice", "hash", true, false, false, false, "alice@example.test")
            .await
            .unwrap();

        let response = refresh_csrf_token(State(state), Extension(CurrentUser(user))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("X-CSRF-TOKEN"));
    }
}
