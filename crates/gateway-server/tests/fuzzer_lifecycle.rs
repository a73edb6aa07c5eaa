//! Admin catalogue setup followed by a project owner creating a fuzzer,
//! driven entirely through the router.

mod common;

use axum::http::StatusCode;
use common::{app_with_state, cookie_value, get_request, json_request, send, session_cookie_header, test_state};
use serde_json::json;

async fn login(app: &axum::Router, username: &str, password: &str) -> (String, String) {
    let response = send(
        app,
        json_request(
            "POST",
            "/api/v1/login",
            "",
            "",
            json!({ "username": username, "password": password, "session_metadata": "ua" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = session_cookie_header(&response);
    let csrf_token = cookie_value(&response, "CSRF_TOKEN").unwrap();
    (cookie, csrf_token)
}

#[tokio::test]
async fn owner_creates_project_and_fuzzer_after_admin_registers_engine() {
    let state = test_state();
    let admin_hash = gateway_auth::password::hash_password("root-pw").unwrap();
    state
        .db
        .users()
        .create("root", "Root", &admin_hash, true, false, true, true, "root@example.test")
        .await
        .unwrap();
    let owner_hash = gateway_auth::password::hash_password("owner-pw").unwrap();
    state
        .db
        .users()
        .create("owner", "Owner", &owner_hash, true, false, false, false, "owner@example.test")
        .await
        .unwrap();
    let owner_id = state.db.users().get_by_name("owner").await.unwrap().id;

    let app = app_with_state(state);

    let (admin_cookie, admin_csrf) = login(&app, "root", "root-pw").await;
    let engine_response = send(
        &app,
        json_request(
            "POST",
            "/api/v1/admin/engines",
            &admin_cookie,
            &admin_csrf,
            json!({ "id": "Libfuzzer", "display_name": "libFuzzer", "langs": ["Cpp"] }),
        ),
    )
    .await;
    assert_eq!(engine_response.status(), StatusCode::CREATED);

    let (owner_cookie, owner_csrf) = login(&app, "owner", "owner-pw").await;
    let project_response = send(
        &app,
        json_request(
            "POST",
            &format!("/api/v1/users/{owner_id}/projects"),
            &owner_cookie,
            &owner_csrf,
            json!({ "name": "proj", "description": "a project" }),
        ),
    )
    .await;
    assert_eq!(project_response.status(), StatusCode::CREATED);
    let project_body: serde_json::Value = axum::body::to_bytes(project_response.into_body(), usize::MAX)
        .await
        .map(|bytes| serde_json::from_slice(&bytes).unwrap())
        .unwrap();
    let project_id = project_body["id"].as_str().unwrap();

    let fuzzer_response = send(
        &app,
        json_request(
            "POST",
            &format!("/api/v1/users/{owner_id}/projects/{project_id}/fuzzers"),
            &owner_cookie,
            &owner_csrf,
            json!({ "name": "fuzzer-a", "description": "a fuzzer", "engine": "Libfuzzer", "lang": "Cpp" }),
        ),
    )
    .await;
    assert_eq!(fuzzer_response.status(), StatusCode::CREATED);

    let list_response = send(
        &app,
        get_request(&format!("/api/v1/users/{owner_id}/projects/{project_id}/fuzzers?pg_size=50"), &owner_cookie),
    )
    .await;
    assert_eq!(list_response.status(), StatusCode::OK);
    let fuzzers: serde_json::Value = axum::body::to_bytes(list_response.into_body(), usize::MAX)
        .await
        .map(|bytes| serde_json::from_slice(&bytes).unwrap())
        .unwrap();
    assert_eq!(fuzzers.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn stranger_cannot_create_project_for_another_user() {
    let state = test_state();
    let owner_hash = gateway_auth::password::hash_password("owner-pw").unwrap();
    state
        .db
        .users()
        .create("owner", "Owner", &owner_hash, true, false, false, false, "owner@example.test")
        .await
        .unwrap();
    let owner_id = state.db.users().get_by_name("owner").await.unwrap().id;
    let stranger_hash = gateway_auth::password::hash_password("stranger-pw").unwrap();
    state
        .db
        .users()
        .create("stranger", "Stranger", &stranger_hash, true, false, false, false, "stranger@example.test")
        .await
        .unwrap();

    let app = app_with_state(state);
    let (stranger_cookie, stranger_csrf) = login(&app, "stranger", "stranger-pw").await;

    let response = send(
        &app,
        json_request(
            "POST",
            &format!("/api/v1/users/{owner_id}/projects"),
            &stranger_cookie,
            &stranger_csrf,
            json!({ "name": "proj", "description": "a project" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
