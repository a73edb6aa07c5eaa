//! Shared harness for the gateway-server integration tests: an in-memory
//! `AppState`, a router built from it, and small cookie-jar helpers for
//! driving the login/CSRF dance through `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderMap, Request, Response};
use axum::Router;
use gateway_auth::{BruteforceProtectionSettings, CookieSettings, CsrfProtectionSettings};
use gateway_db::fake::{InMemoryDatabase, InMemoryUnsentMessages};
use gateway_db::Database;
use gateway_mq::fake::InMemoryMessageQueue;
use gateway_mq::{MessageQueue, Producers};
use gateway_server::config::{
    ApiEndpointSettings, DatabaseSettings, DefaultUserSettings, Environment, EnvironmentSettings,
    FuzzerSettings, GatewayConfig, MessageQueueSettings, PlatformType, RevisionSettings,
    SystemAdminSettings, TrashbinSettings,
};
use gateway_server::{AppState, GatewayRouter};
use gateway_storage::fake::InMemoryObjectStore;
use gateway_storage::{GatewayStorage, ObjectStorageSettings};
use tower::ServiceExt;

/// Builds a fully in-memory `AppState`, mirroring `GatewayConfig::for_tests`
/// but from outside the crate, where that constructor isn't visible.
pub fn test_state() -> AppState {
    let db: Arc<dyn Database> = Arc::new(InMemoryDatabase::new());
    let storage = GatewayStorage::new(Arc::new(InMemoryObjectStore::default()), 500_000_000);
    let mq: Arc<dyn MessageQueue> = Arc::new(InMemoryMessageQueue::default());
    let unsent: Arc<dyn gateway_db::traits::UnsentMessages> = Arc::new(InMemoryUnsentMessages::default());
    let producers = Arc::new(Producers::new(mq, unsent));
    let config = Arc::new(GatewayConfig {
        bind_addr: "127.0.0.1:0".into(),
        environment: EnvironmentSettings { environment: Environment::Test, platform_type: PlatformType::Onprem },
        object_storage: ObjectStorageSettings {
            endpoint: Some("http://localhost:9000".into()),
            region: "us-east-1".into(),
            access_key: "test".into(),
            secret_key: "test".into(),
            bucket: "test-bucket".into(),
            upload_length_cap: 500_000_000,
        },
        message_queue: MessageQueueSettings {
            queue_own: "gateway.own".into(),
            queue_dlq: "gateway.dlq".into(),
            queue_scheduler: "scheduler".into(),
            queue_jira_reporter: "jira-reporter".into(),
            queue_yt_reporter: "youtrack-reporter".into(),
            queue_pool_manager: "pool-manager".into(),
            region: "us-east-1".into(),
        },
        bruteforce_protection: BruteforceProtectionSettings {
            lockout_period_sec: 3_600,
            max_failed_logins: 5,
            cleanup_interval_sec: 300,
            secret_key: "test-bfp-secret".into(),
        },
        csrf_protection: CsrfProtectionSettings {
            enabled: true,
            token_exp_seconds: 3_600,
            secret_key: "test-csrf-secret".into(),
        },
        cookie: CookieSettings { expiration_seconds: 86_400, secure: false },
        trashbin: TrashbinSettings { expiration_seconds: 604_800 },
        fuzzer: FuzzerSettings { min_cpu_usage: 100, min_ram_usage: 256, min_tmpfs_usage: 0 },
        revision: RevisionSettings {
            binaries_upload_limit: 500_000_000,
            seeds_upload_limit: 500_000_000,
            config_upload_limit: 1_000_000,
        },
        api_endpoints: ApiEndpointSettings {
            self_url: "http://localhost:8080".into(),
            jira_reporter_url: "http://localhost:8081".into(),
            yt_reporter_url: "http://localhost:8082".into(),
            pool_manager_url: "http://localhost:8083".into(),
        },
        database: DatabaseSettings { url: "postgres://test".into() },
        system_admin: SystemAdminSettings {
            name: "root".into(),
            password: "root-password".into(),
            email: "root@example.test".into(),
        },
        default_user: DefaultUserSettings { enabled: false, name: None, password: None, email: None },
    });
    AppState::new(db, storage, producers, config)
}

#[allow(dead_code)]
pub fn app() -> Router {
    GatewayRouter::new(test_state()).build()
}

#[allow(dead_code)]
pub fn app_with_state(state: AppState) -> Router {
    GatewayRouter::new(state).build()
}

/// Extracts the value half of a `name=value` pair from a `Set-Cookie`
/// header, ignoring the trailing attributes.
pub fn cookie_value(response: &Response<Body>, name: &str) -> Option<String> {
    response
        .headers()
        .get_all(axum::http::header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|raw| {
            let (pair, _) = raw.split_once(';').unwrap_or((raw, ""));
            let (k, v) = pair.split_once('=')?;
            (k == name).then(|| v.to_string())
        })
}

/// Builds the `Cookie` header value from a login response's `Set-Cookie`
/// headers, the way a real client's cookie jar would.
pub fn session_cookie_header(response: &Response<Body>) -> String {
    let mut pairs = Vec::new();
    for name in ["SESSION_ID", "USER_ID", "CSRF_TOKEN"] {
        if let Some(value) = cookie_value(response, name) {
            pairs.push(format!("{name}={value}"));
        }
    }
    pairs.join("; ")
}

pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

pub fn json_request(method: &str, uri: &str, cookie: &str, csrf_token: &str, body: serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .header(axum::http::header::COOKIE, cookie);
    if !csrf_token.is_empty() {
        builder = builder.header("x-csrf-token", csrf_token);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn get_request(uri: &str, cookie: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header(axum::http::header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

#[allow(dead_code)]
pub fn empty_headers() -> HeaderMap {
    HeaderMap::new()
}
