//! Double-submit CSRF verification for state-changing requests.
//!
//! Runs after [`super::session::session_middleware`] has resolved
//! `CurrentUser`, so it always has a trusted user id to bind the token
//! against. Applied by the router to every `POST`/`PUT`/`PATCH`/`DELETE`
//! route except `login` and `refresh_csrf_token`, which issue the token in
//! the first place.

use axum::extract::{Request, State};
use axum::http::header::HeaderName;
use axum::middleware::Next;
use axum::response::Response;
use gateway_auth::csrf;
use gateway_error::{ErrorCode, GatewayError};

use crate::middleware::session::CurrentUser;
use crate::state::AppState;

static CSRF_HEADER: HeaderName = HeaderName::from_static("x-csrf-token");

/// `GET`/`HEAD` never carry a body that mutates state; the double-submit
/// check only guards the methods that do.
fn is_safe_method(method: &axum::http::Method) -> bool {
    matches!(*method, axum::http::Method::GET | axum::http::Method::HEAD)
}

pub async fn csrf_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, GatewayError> {
    if !state.config.csrf_protection.enabled || is_safe_method(request.method()) {
        return Ok(next.run(request).await);
    }

    let current_user = request
        .extensions()
        .get::<CurrentUser>()
        .ok_or_else(|| GatewayError::code(ErrorCode::AuthorizationRequired))?
        .0
        .clone();

    let cookie_token = cookie_value(&request, "CSRF_TOKEN")
        .ok_or_else(|| GatewayError::code(ErrorCode::CsrfTokenMissing))?;
    let header_token = request
        .headers()
        .get(&CSRF_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| GatewayError::code(ErrorCode::CsrfTokenMissing))?
        .to_string();

    if !csrf::matches(&cookie_token, &header_token) {
        return Err(GatewayError::code(ErrorCode::CsrfTokenMismatch));
    }

    csrf::verify(
        &cookie_token,
        &state.config.csrf_protection.secret_key,
        current_user.id,
        state.config.csrf_protection.token_exp_seconds,
    )?;

    Ok(next.run(request).await)
}

fn cookie_value(request: &Request, name: &str) -> Option<String> {
    let raw = request
        .headers()
        .get(axum::http::header::COOKIE)
        .and_then(|v| v.to_str().ok())?;
    raw.split(';').find_map(|pair| {
        let (k, v) = pair.trim().split_once('=')?;
        (k == name).then(|| v.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_value_finds_named_pair() {
        let request = Request::builder()
            .header(axum::http::header::COOKIE, "SESSION_ID=a; CSRF_TOKEN=tok")
            .body(axum::body::Body::empty())
            .unwrap();
        assert_eq!(cookie_value(&request, "CSRF_TOKEN"), Some("tok".to_string()));
        assert_eq!(cookie_value(&request, "MISSING"), None);
    }
}
