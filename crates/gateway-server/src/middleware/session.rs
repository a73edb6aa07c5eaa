//! Session-cookie resolution.
//!
//! Resolves the `SESSION_ID` cookie to a stored session record and checks
//! that the `USER_ID` cookie the client presents actually matches the
//! session owner, then loads the user and checks its status. A resolved
//! `CurrentUser` is inserted into request extensions for downstream
//! extractors and handlers; nothing here ever trusts a header a client can
//! set directly, only the two signed-by-possession cookies set at login.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use chrono::Utc;
use gateway_db::model::{RemovalState, User};
use gateway_error::{ErrorCode, GatewayError};
use uuid::Uuid;

use crate::state::AppState;

/// The authenticated user for this request, set by [`session_middleware`]
/// and read back out by handlers via `Extension<CurrentUser>`.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Reads `SESSION_ID`/`USER_ID` off the `Cookie` header, resolves the
/// session, and stashes the resolved user on the request. Rejects with
/// `E_AUTHORIZATION_REQUIRED` if either cookie is missing, the session
/// doesn't resolve, the stored owner doesn't match `USER_ID`, or the user
/// fails a status check.
///
/// Endpoints that don't require a session (`login`, health checks) are
/// simply not wrapped in this layer by the router.
pub async fn session_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, GatewayError> {
    let jar = cookie_jar(request.headers());

    let session_id = jar
        .get("SESSION_ID")
        .and_then(|raw| raw.parse::<Uuid>().ok())
        .ok_or_else(|| GatewayError::code(ErrorCode::AuthorizationRequired))?;
    let claimed_user_id = jar
        .get("USER_ID")
        .and_then(|raw| raw.parse::<Uuid>().ok())
        .ok_or_else(|| GatewayError::code(ErrorCode::AuthorizationRequired))?;

    let session = state
        .db
        .cookies()
        .get(session_id, Some(claimed_user_id))
        .await
        .map_err(|_| GatewayError::code(ErrorCode::AuthorizationRequired))?;

    if session.user_id != claimed_user_id {
        return Err(GatewayError::code(ErrorCode::AuthorizationRequired));
    }

    let user = state
        .db
        .users()
        .get_by_id(session.user_id)
        .await
        .map_err(|_| GatewayError::code(ErrorCode::AuthorizationRequired))?;

    if user.removal_state(Utc::now()) != RemovalState::Present || !user.is_confirmed || user.is_disabled {
        return Err(GatewayError::code(ErrorCode::AuthorizationRequired));
    }

    request.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(request).await)
}

/// Minimal `Cookie` header parser: splits on `;` and the first `=`, the
/// shape the `Set-Cookie`/`Cookie` pair written at login always produces.
fn cookie_jar(headers: &axum::http::HeaderMap) -> Vec<(String, String)> {
    headers
        .get(axum::http::header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(|raw| {
            raw.split(';')
                .filter_map(|pair| {
                    let (name, value) = pair.trim().split_once('=')?;
                    Some((name.to_string(), value.to_string()))
                })
                .collect()
        })
        .unwrap_or_default()
}

trait JarExt {
    fn get(&self, name: &str) -> Option<&str>;
}

impl JarExt for Vec<(String, String)> {
    fn get(&self, name: &str) -> Option<&str> {
        self.iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_multiple_cookies() {
        let mut headers = axum::http::HeaderMap::new();
        headers.insert(
            axum::http::header::COOKIE,
            "SESSION_ID=abc; USER_ID=def".parse().unwrap(),
        );
        let jar = cookie_jar(&headers);
        assert_eq!(jar.get("SESSION_ID"), Some("abc"));
        assert_eq!(jar.get("USER_ID"), Some("def"));
    }

    #[test]
    fn missing_cookie_header_yields_empty_jar() {
        let headers = axum::http::HeaderMap::new();
        assert!(cookie_jar(&headers).is_empty());
    }
}
