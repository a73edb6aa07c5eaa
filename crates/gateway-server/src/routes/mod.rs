//! Router assembly. Mirrors the resource tree: a handful of public routes,
//! then a session-protected tree with a CSRF-protected subtree nested
//! inside it. `GatewayRouter::build` is the only thing `main.rs` calls.

use axum::middleware::from_fn_with_state;
use axum::routing::{delete, get, patch, post, put};
use axum::Router;

use crate::handlers::{admin, auth, config_public, fuzzers, integrations, projects, revisions, statistics, users};
use crate::middleware::{csrf::csrf_middleware, session::session_middleware};
use crate::state::AppState;

pub struct GatewayRouter {
    state: AppState,
}

impl GatewayRouter {
    #[must_use]
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    #[must_use]
    pub fn build(self) -> Router {
        let state = self.state;

        let public = Router::new()
            .route("/login", post(auth::login))
            .route("/config", get(config_public::get_config))
            .route("/config/langs", get(config_public::list_langs))
            .route("/config/engines", get(config_public::list_engines))
            .route("/config/integration_types", get(config_public::list_integration_types));

        // Issues the very token the CSRF layer checks, so it sits outside it.
        let csrf_exempt = Router::new().route("/security/csrf-token", post(auth::refresh_csrf_token));

        let csrf_protected = Router::new()
            .merge(users_routes())
            .merge(projects_routes())
            .merge(fuzzers_routes())
            .merge(revisions_routes())
            .merge(statistics_routes())
            .merge(integrations_routes())
            .merge(admin_routes())
            .route("/logout", post(auth::logout))
            .route_layer(from_fn_with_state(state.clone(), csrf_middleware));

        let authenticated = csrf_exempt
            .merge(csrf_protected)
            .route_layer(from_fn_with_state(state.clone(), session_middleware));

        Router::new()
            .nest("/api/v1", public.merge(authenticated))
            .with_state(state)
    }
}

fn users_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(users::list_users).post(users::create_user))
        .route("/users/self", get(users::get_self).patch(users::update_self))
        .route("/users/lookup", get(users::lookup_user))
        .route("/users/count", get(users::count_users))
        .route(
            "/users/{user_id}",
            get(users::get_user).patch(users::update_user).delete(users::delete_user),
        )
}

fn projects_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/users/{user_id}/projects",
            get(projects::list_projects).post(projects::create_project),
        )
        .route("/users/{user_id}/projects/trashbin", delete(projects::empty_trashbin))
        .route(
            "/users/{user_id}/projects/{project_id}",
            get(projects::get_project).patch(projects::update_project).delete(projects::delete_project),
        )
}

fn fuzzers_routes() -> Router<AppState> {
    const BASE: &str = "/users/{user_id}/projects/{project_id}/fuzzers";
    Router::new()
        .route(BASE, get(fuzzers::list_fuzzers).post(fuzzers::create_fuzzer))
        .route(&format!("{BASE}/trashbin/count"), get(fuzzers::trashbin_count))
        .route(&format!("{BASE}/trashbin/{{fuzzer_id}}"), delete(fuzzers::trashbin_erase_one))
        .route(
            &format!("{BASE}/{{fuzzer_id}}"),
            get(fuzzers::get_fuzzer).patch(fuzzers::update_fuzzer).delete(fuzzers::delete_fuzzer),
        )
        .route(&format!("{BASE}/{{fuzzer_id}}/trashbin"), get(fuzzers::trashbin_list))
        .route(&format!("{BASE}/{{fuzzer_id}}/files/corpus"), get(fuzzers::download_corpus))
        .route(&format!("{BASE}/{{fuzzer_id}}/actions/start"), post(fuzzers::start_fuzzer))
        .route(&format!("{BASE}/{{fuzzer_id}}/actions/restart"), post(fuzzers::restart_fuzzer))
        .route(&format!("{BASE}/{{fuzzer_id}}/actions/stop"), post(fuzzers::stop_fuzzer))
        .route(
            &format!("{BASE}/{{fuzzer_id}}/active"),
            get(revisions::get_active_revision).put(revisions::set_active_revision),
        )
}

fn revisions_routes() -> Router<AppState> {
    const BASE: &str = "/users/{user_id}/projects/{project_id}/fuzzers/{fuzzer_id}/revisions";
    Router::new()
        .route(BASE, get(revisions::list_revisions).post(revisions::create_revision))
        .route(
            &format!("{BASE}/{{revision_id}}"),
            get(revisions::get_revision).patch(revisions::update_revision).delete(revisions::delete_revision),
        )
        .route(&format!("{BASE}/{{revision_id}}/resources"), patch(revisions::update_resources))
        .route(&format!("{BASE}/{{revision_id}}/actions/start"), post(revisions::start_revision))
        .route(&format!("{BASE}/{{revision_id}}/actions/restart"), post(revisions::restart_revision))
        .route(&format!("{BASE}/{{revision_id}}/actions/stop"), post(revisions::stop_revision))
        .route(
            &format!("{BASE}/{{revision_id}}/files/binaries"),
            get(revisions::download_binaries).put(revisions::upload_binaries),
        )
        .route(
            &format!("{BASE}/{{revision_id}}/files/seeds"),
            get(revisions::download_seeds).put(revisions::upload_seeds),
        )
        .route(
            &format!("{BASE}/{{revision_id}}/files/config"),
            get(revisions::download_config).put(revisions::upload_config),
        )
        .route(
            &format!("{BASE}/{{revision_id}}/files/corpus"),
            get(revisions::download_revision_corpus).put(revisions::copy_corpus),
        )
}

fn statistics_routes() -> Router<AppState> {
    const BASE: &str = "/users/{user_id}/projects/{project_id}/fuzzers/{fuzzer_id}";
    Router::new()
        .route(&format!("{BASE}/statistics"), get(statistics::fuzzer_statistics))
        .route(&format!("{BASE}/crashes"), get(statistics::fuzzer_crashes))
        .route(
            &format!("{BASE}/revisions/{{revision_id}}/statistics"),
            get(statistics::revision_statistics),
        )
        .route(
            &format!("{BASE}/revisions/{{revision_id}}/crashes"),
            get(statistics::revision_crashes),
        )
        .route(&format!("{BASE}/crashes/{{crash_id}}"), get(statistics::get_crash).patch(statistics::archive_crash))
}

fn integrations_routes() -> Router<AppState> {
    const BASE: &str = "/users/{user_id}/projects/{project_id}/integrations";
    Router::new()
        .route(BASE, get(integrations::list_integrations).post(integrations::create_integration))
        .route(
            &format!("{BASE}/{{integration_id}}"),
            get(integrations::get_integration)
                .patch(integrations::update_integration)
                .delete(integrations::delete_integration),
        )
}

fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/langs", get(admin::list_langs).post(admin::create_lang))
        .route("/admin/langs/{lang_id}", delete(admin::delete_lang))
        .route("/admin/engines", get(admin::list_engines).post(admin::create_engine))
        .route("/admin/engines/{engine_id}", delete(admin::delete_engine))
        .route("/admin/engines/{engine_id}/langs", put(admin::set_engine_langs))
        .route("/admin/images", get(admin::list_images).post(admin::create_image))
        .route(
            "/admin/images/{image_id}",
            patch(admin::update_image).delete(admin::delete_image),
        )
        .route("/admin/integration_types", get(admin::list_integration_types))
        .route("/admin/pools", get(admin::list_pools).post(admin::create_pool))
        .route("/admin/pools/{pool_id}", delete(admin::delete_pool))
}
