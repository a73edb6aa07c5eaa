//! Login, session cookie, and CSRF double-submit flow end to end through
//! the real router (no handler called directly).

mod common;

use axum::http::StatusCode;
use common::{app, cookie_value, get_request, json_request, send, session_cookie_header, test_state};
use gateway_server::GatewayRouter;
use serde_json::json;

async fn create_user(state: &gateway_server::AppState, name: &str, password: &str) {
    let hash = gateway_auth::password::hash_password(password).unwrap();
    state
        .db
        .users()
        .create(name, name, &hash, true, false, false, false, &format!("{name}@example.test"))
        .await
        .unwrap();
}

#[tokio::test]
async fn login_then_self_lookup_round_trips() {
    let state = test_state();
    create_user(&state, "alice", "hunter22").await;
    let app = GatewayRouter::new(state).build();

    let login_response = send(
        &app,
        json_request(
            "POST",
            "/api/v1/login",
            "",
            "",
            json!({ "username": "alice", "password": "hunter22", "session_metadata": "ua" }),
        ),
    )
    .await;
    assert_eq!(login_response.status(), StatusCode::OK);
    let cookie = session_cookie_header(&login_response);
    assert!(cookie.contains("SESSION_ID="));

    let self_response = send(&app, get_request("/api/v1/users/self", &cookie)).await;
    assert_eq!(self_response.status(), StatusCode::OK);
}

#[tokio::test]
async fn request_without_session_cookie_is_rejected() {
    let app = app();
    let response = send(&app, get_request("/api/v1/users/self", "")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn mutating_request_without_csrf_token_is_rejected() {
    let state = test_state();
    create_user(&state, "alice", "hunter22").await;
    let app = GatewayRouter::new(state).build();

    let login_response = send(
        &app,
        json_request(
            "POST",
            "/api/v1/login",
            "",
            "",
            json!({ "username": "alice", "password": "hunter22", "session_metadata": "ua" }),
        ),
    )
    .await;
    let cookie = session_cookie_header(&login_response);

    let response = send(
        &app,
        json_request("PATCH", "/api/v1/users/self", &cookie, "", json!({ "display_name": "x" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn mutating_request_with_matching_csrf_token_succeeds() {
    let state = test_state();
    create_user(&state, "alice", "hunter22").await;
    let app = GatewayRouter::new(state).build();

    let login_response = send(
        &app,
        json_request(
            "POST",
            "/api/v1/login",
            "",
            "",
            json!({ "username": "alice", "password": "hunter22", "session_metadata": "ua" }),
        ),
    )
    .await;
    let cookie = session_cookie_header(&login_response);
    let csrf_token = cookie_value(&login_response, "CSRF_TOKEN").unwrap();

    let response = send(
        &app,
        json_request("PATCH", "/api/v1/users/self", &cookie, &csrf_token, json!({ "display_name": "Alice R." })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}
