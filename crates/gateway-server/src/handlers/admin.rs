//! `/admin/{images|engines|langs|integration_types|pools}` — every handler
//! here requires an admin session; node-group shape validation additionally
//! depends on the platform type the gateway was deployed under.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use gateway_db::model::{Engine, EngineId, Image, ImageStatus, Lang, LangId, Paginator};
use gateway_error::{ErrorCode, GatewayError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::PlatformType;
use crate::middleware::session::CurrentUser;
use crate::path::require_admin;
use crate::pool_manager::{NodeGroup, Pool, PoolResources};
use crate::state::AppState;

// ---------------------------------------------------------------------
// Langs
// ---------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CreateLangRequest {
    pub id: LangId,
    pub display_name: String,
}

pub async fn create_lang(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(body): Json<CreateLangRequest>,
) -> Result<(StatusCode, Json<Lang>), GatewayError> {
    require_admin(&current.0)?;
    if state.db.langs().get_by_id(body.id).await.is_ok() {
        return Err(GatewayError::code(ErrorCode::LangExists));
    }
    let lang = state.db.langs().create(body.id, &body.display_name).await?;
    Ok((StatusCode::CREATED, Json(lang)))
}

pub async fn list_langs(State(state): State<AppState>, Extension(current): Extension<CurrentUser>) -> Result<Json<Vec<Lang>>, GatewayError> {
    require_admin(&current.0)?;
    let langs = state.db.langs().list(None).await?;
    Ok(Json(langs))
}

/// Best-effort referential check: scans the engine table for any engine
/// that still lists `lang_id`, since no direct in-use counter exists.
async fn lang_in_use(state: &AppState, lang_id: LangId) -> Result<bool, GatewayError> {
    let engines = state.db.engines().list(None, Some(lang_id)).await?;
    Ok(!engines.is_empty())
}

pub async fn delete_lang(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(lang_id): Path<LangId>,
) -> Result<StatusCode, GatewayError> {
    require_admin(&current.0)?;
    let lang = state
        .db
        .langs()
        .get_by_id(lang_id)
        .await
        .map_err(|_| GatewayError::code(ErrorCode::LangNotFound))?;
    if lang_in_use(&state, lang_id).await? {
        return Err(GatewayError::code(ErrorCode::LangInUseBy));
    }
    state.db.langs().delete(&lang).await?;
    Ok(StatusCode::OK)
}

// ---------------------------------------------------------------------
// Engines
// ---------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CreateEngineRequest {
    pub id: EngineId,
    pub display_name: String,
    pub langs: Vec<LangId>,
}

pub async fn create_engine(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(body): Json<CreateEngineRequest>,
) -> Result<(StatusCode, Json<Engine>), GatewayError> {
    require_admin(&current.0)?;
    if body.langs.is_empty() {
        return Err(GatewayError::code(ErrorCode::LangsInvalid));
    }
    if state.db.engines().get_by_id(body.id.clone()).await.is_ok() {
        return Err(GatewayError::code(ErrorCode::EngineExists));
    }
    let engine = state.db.engines().create(body.id, &body.display_name, &body.langs).await?;
    Ok((StatusCode::CREATED, Json(engine)))
}

pub async fn list_engines(State(state): State<AppState>, Extension(current): Extension<CurrentUser>) -> Result<Json<Vec<Engine>>, GatewayError> {
    require_admin(&current.0)?;
    let engines = state.db.engines().list(None, None).await?;
    Ok(Json(engines))
}

#[derive(Debug, Deserialize)]
pub struct SetEngineLangsRequest {
    pub langs: Vec<LangId>,
}

pub async fn set_engine_langs(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(engine_id): Path<EngineId>,
    Json(body): Json<SetEngineLangsRequest>,
) -> Result<StatusCode, GatewayError> {
    require_admin(&current.0)?;
    if body.langs.is_empty() {
        return Err(GatewayError::code(ErrorCode::LangsInvalid));
    }
    let engine = state
        .db
        .engines()
        .get_by_id(engine_id.clone())
        .await
        .map_err(|_| GatewayError::code(ErrorCode::EngineNotFound))?;
    state.db.engines().set_langs(&engine, &body.langs).await?;
    Ok(StatusCode::OK)
}

/// Best-effort referential check over every fuzzer that names this engine.
async fn engine_in_use(state: &AppState, engine_id: &EngineId) -> Result<bool, GatewayError> {
    let fuzzers = state
        .db
        .fuzzers()
        .list(Some(Paginator::new(0, 200)), None, None)
        .await?;
    Ok(fuzzers.iter().any(|f| &f.engine == engine_id))
}

pub async fn delete_engine(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(engine_id): Path<EngineId>,
) -> Result<StatusCode, GatewayError> {
    require_admin(&current.0)?;
    let engine = state
        .db
        .engines()
        .get_by_id(engine_id.clone())
        .await
        .map_err(|_| GatewayError::code(ErrorCode::EngineNotFound))?;
    if engine_in_use(&state, &engine_id).await? {
        return Err(GatewayError::code(ErrorCode::EngineInUseBy));
    }
    state.db.engines().delete(&engine).await?;
    Ok(StatusCode::OK)
}

// ---------------------------------------------------------------------
// Images
// ---------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CreateImageRequest {
    pub name: String,
    pub description: String,
    pub project_id: Option<Uuid>,
    pub engines: Vec<EngineId>,
}

pub async fn create_image(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(body): Json<CreateImageRequest>,
) -> Result<(StatusCode, Json<Image>), GatewayError> {
    require_admin(&current.0)?;
    if body.engines.is_empty() {
        return Err(GatewayError::code(ErrorCode::EnginesInvalid));
    }
    if state.db.images().get_by_name(&body.name, body.project_id).await.is_ok() {
        return Err(GatewayError::code(ErrorCode::ImageExists));
    }
    let image = state
        .db
        .images()
        .create(&body.name, &body.description, body.project_id, &body.engines, ImageStatus::NotPushed)
        .await?;
    Ok((StatusCode::CREATED, Json(image)))
}

#[derive(Debug, Deserialize)]
pub struct ImageListQuery {
    #[serde(default)]
    pub pg_num: u32,
    #[serde(default = "default_page_size")]
    pub pg_size: u32,
    pub project_id: Option<Uuid>,
}

fn default_page_size() -> u32 {
    100
}

pub async fn list_images(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(page): Query<ImageListQuery>,
) -> Result<Json<Vec<Image>>, GatewayError> {
    require_admin(&current.0)?;
    let images = state
        .db
        .images()
        .list(Paginator::new(page.pg_num, page.pg_size), page.project_id, None, None, None)
        .await?;
    Ok(Json(images))
}

#[derive(Debug, Deserialize)]
pub struct UpdateImageRequest {
    pub description: Option<String>,
    pub status: Option<ImageStatus>,
}

pub async fn update_image(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(image_id): Path<Uuid>,
    Json(body): Json<UpdateImageRequest>,
) -> Result<Json<Image>, GatewayError> {
    require_admin(&current.0)?;
    let mut image = state
        .db
        .images()
        .get_by_id(image_id, None)
        .await
        .map_err(|_| GatewayError::code(ErrorCode::ImageNotFound))?;
    if let Some(description) = body.description {
        image.description = description;
    }
    if let Some(status) = body.status {
        image.status = status;
    }
    state.db.images().update(&image).await?;
    Ok(Json(image))
}

pub async fn delete_image(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(image_id): Path<Uuid>,
) -> Result<StatusCode, GatewayError> {
    require_admin(&current.0)?;
    let image = state
        .db
        .images()
        .get_by_id(image_id, None)
        .await
        .map_err(|_| GatewayError::code(ErrorCode::ImageNotFound))?;
    state.db.images().delete(&image).await?;
    Ok(StatusCode::OK)
}

// ---------------------------------------------------------------------
// Integration types (read-only catalogue)
// ---------------------------------------------------------------------

pub async fn list_integration_types(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<Vec<gateway_db::model::IntegrationType>>, GatewayError> {
    require_admin(&current.0)?;
    let types = state.db.integration_types().list(None).await?;
    Ok(Json(types))
}

// ---------------------------------------------------------------------
// Pools (proxied to the external pool-manager service)
// ---------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct PoolView {
    pub id: String,
    pub resources: PoolResources,
}

impl From<Pool> for PoolView {
    fn from(p: Pool) -> Self {
        Self {
            id: p.id,
            resources: p.resources,
        }
    }
}

pub async fn list_pools(State(state): State<AppState>, Extension(current): Extension<CurrentUser>) -> Result<Json<Vec<PoolView>>, GatewayError> {
    require_admin(&current.0)?;
    let pools = state.pool_manager.list_pools().await?;
    Ok(Json(pools.into_iter().map(PoolView::from).collect()))
}

#[derive(Debug, Deserialize)]
pub struct CreatePoolRequest {
    pub name: String,
    pub node_group: NodeGroup,
    pub resources: PoolResources,
}

/// Cloud platforms require `{node_cpu, node_ram, node_count}`; on-prem and
/// demo platforms only size a node count against a fixed local machine.
fn validate_node_group(platform: PlatformType, node_group: &NodeGroup) -> Result<(), GatewayError> {
    match (platform, node_group) {
        (PlatformType::Cloud, NodeGroup::Cloud { node_cpu, node_ram, .. }) => {
            if *node_cpu <= 0 {
                return Err(GatewayError::code(ErrorCode::NodeCpuInvalid));
            }
            if *node_ram <= 0 {
                return Err(GatewayError::code(ErrorCode::NodeRamInvalid));
            }
            if node_ram % node_cpu != 0 {
                return Err(GatewayError::code(ErrorCode::CpuRamMultiplicityBroken));
            }
            Ok(())
        }
        (PlatformType::Onprem | PlatformType::Demo, NodeGroup::Local { .. }) => Ok(()),
        _ => Err(GatewayError::code(ErrorCode::InvalidNodeGroup)),
    }
}

pub async fn create_pool(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(body): Json<CreatePoolRequest>,
) -> Result<(StatusCode, Json<PoolView>), GatewayError> {
    require_admin(&current.0)?;
    validate_node_group(state.config.environment.platform_type, &body.node_group)?;
    let pool = state
        .pool_manager
        .create_pool(&body.name, &body.node_group, &body.resources)
        .await?;
    Ok((StatusCode::CREATED, Json(pool.into())))
}

pub async fn delete_pool(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(pool_id): Path<String>,
) -> Result<StatusCode, GatewayError> {
    require_admin(&current.0)?;
    state.pool_manager.delete_pool(&pool_id).await?;
    Ok(StatusCode::OK)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_state;

    async fn admin(state: &AppState) -> CurrentUser {
        CurrentUser(
            state
                .db
                .users()
                .create("admin", "Admin", "hash", true, false, true, false, "admin@example.test")
                .await
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn delete_lang_rejects_when_engine_still_references_it() {
        let state = test_state();
        let current = admin(&state).await;
        state.db.langs().create(LangId::Rust, "Rust").await.unwrap();
        state.db.engines().create(EngineId::CargoFuzz, "cargo-fuzz", &[LangId::Rust]).await.unwrap();

        let err = delete_lang(State(state), Extension(current), Path(LangId::Rust)).await.unwrap_err();
        assert_eq!(err.error_code().as_str(), "E_LANG_IN_USE_BY");
    }

    #[tokio::test]
    async fn delete_lang_succeeds_when_unreferenced() {
        let state = test_state();
        let current = admin(&state).await;
        state.db.langs().create(LangId::Rust, "Rust").await.unwrap();

        let status = delete_lang(State(state), Extension(current), Path(LangId::Rust)).await.unwrap();
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn delete_engine_rejects_when_fuzzer_still_uses_it() {
        let state = test_state();
        let current = admin(&state).await;
        state.db.engines().create(EngineId::Libfuzzer, "libFuzzer", &[LangId::Cpp]).await.unwrap();
        let owner = state
            .db
            .users()
            .create("owner", "Owner", "hash", true, false, false, false, "owner@example.test")
            .await
            .unwrap();
        let project = state.db.projects().create("proj", "d", owner.id, None).await.unwrap();
        state
            .db
            .fuzzers()
            .create("fuzzer-a", "d", project.id, EngineId::Libfuzzer, LangId::Cpp, false)
            .await
            .unwrap();

        let err = delete_engine(State(state), Extension(current), Path(EngineId::Libfuzzer)).await.unwrap_err();
        assert_eq!(err.error_code().as_str(), "E_ENGINE_IN_USE_BY");
    }

    #[tokio::test]
    async fn create_engine_rejects_empty_lang_list() {
        let state = test_state();
        let current = admin(&state).await;

        let err = create_engine(
            State(state),
            Extension(current),
            Json(CreateEngineRequest { id: EngineId::Libfuzzer, display_name: "libFuzzer".into(), langs: vec![] }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.error_code().as_str(), "E_LANGS_INVALID");
    }
}
