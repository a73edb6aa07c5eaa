//! `/…/fuzzers/{fuzzer_id}/revisions` CRUD, the active-revision endpoint,
//! lifecycle actions, file upload/download, and corpus copy.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use gateway_db::model::{
    Health, ImageStatus, Paginator, RemovalState, Revision, RevisionStatus, UploadStatus,
};
use gateway_error::{ErrorCode, GatewayError};
use gateway_mq::messages::{StartFuzzer, StopFuzzer};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::handlers::users::{clamp_page_size, DeletionAction, DeletionActionKind, PageQuery};
use crate::middleware::session::CurrentUser;
use crate::path::{check_user_access_permissions, load_fuzzer, load_project, load_revision};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct RevisionView {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub binaries: UploadStatus,
    pub seeds: UploadStatus,
    pub config: UploadStatus,
    pub status: RevisionStatus,
    pub health: Health,
    pub fuzzer_id: Uuid,
    pub image_id: Uuid,
    pub is_verified: bool,
    pub created: chrono::DateTime<chrono::Utc>,
    pub last_start_date: Option<chrono::DateTime<chrono::Utc>>,
    pub last_stop_date: Option<chrono::DateTime<chrono::Utc>>,
    pub cpu_usage: i32,
    pub ram_usage: i32,
    pub tmpfs_size: i32,
    pub erasure_date: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<Revision> for RevisionView {
    fn from(r: Revision) -> Self {
        Self {
            id: r.id,
            name: r.name,
            description: r.description,
            binaries: r.binaries,
            seeds: r.seeds,
            config: r.config,
            status: r.status,
            health: r.health,
            fuzzer_id: r.fuzzer_id,
            image_id: r.image_id,
            is_verified: r.is_verified,
            created: r.created,
            last_start_date: r.last_start_date,
            last_stop_date: r.last_stop_date,
            cpu_usage: r.cpu_usage,
            ram_usage: r.ram_usage,
            tmpfs_size: r.tmpfs_size,
            erasure_date: r.erasure_date,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateRevisionRequest {
    pub name: String,
    pub description: String,
    pub image_id: Uuid,
    pub cpu_usage: i32,
    pub ram_usage: i32,
    pub tmpfs_size: i32,
}

/// `POST /…/revisions`.
pub async fn create_revision(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path((user_id, project_id, fuzzer_id)): Path<(Uuid, Uuid, Uuid)>,
    Json(body): Json<CreateRevisionRequest>,
) -> Result<(StatusCode, Json<RevisionView>), GatewayError> {
    check_user_access_permissions(&current.0, user_id)?;
    load_project(&state, project_id, user_id, true).await?;
    let fuzzer = load_fuzzer(&state, fuzzer_id, project_id, true).await?;

    let image = state
        .db
        .images()
        .get_by_id(body.image_id, Some(project_id))
        .await
        .map_err(|_| GatewayError::code(ErrorCode::ImageNotFound))?;
    if !image.engines.contains(&fuzzer.engine) {
        return Err(GatewayError::code(ErrorCode::FuzzerEngineMismatch));
    }

    if state.db.revisions().get_by_name(&body.name, fuzzer_id).await.is_ok() {
        return Err(GatewayError::code(ErrorCode::RevisionExists));
    }

    let revision = state
        .db
        .revisions()
        .create(
            &body.name,
            &body.description,
            fuzzer_id,
            body.image_id,
            body.cpu_usage,
            body.ram_usage,
            body.tmpfs_size,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(revision.into())))
}

/// `GET /…/revisions`.
pub async fn list_revisions(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path((user_id, project_id, fuzzer_id)): Path<(Uuid, Uuid, Uuid)>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<RevisionView>>, GatewayError> {
    check_user_access_permissions(&current.0, user_id)?;
    load_project(&state, project_id, user_id, false).await?;
    load_fuzzer(&state, fuzzer_id, project_id, false).await?;
    let page_size = clamp_page_size(page.pg_size)?;
    let removal_state = page.removal_state.map(RemovalState::from);
    let revisions = state
        .db
        .revisions()
        .list(Paginator::new(page.pg_num, page_size), Some(fuzzer_id), removal_state, None, None)
        .await?;
    Ok(Json(revisions.into_iter().map(RevisionView::from).collect()))
}

/// `GET /…/revisions/{revision_id}`.
pub async fn get_revision(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path((user_id, project_id, fuzzer_id, revision_id)): Path<(Uuid, Uuid, Uuid, Uuid)>,
) -> Result<Json<RevisionView>, GatewayError> {
    check_user_access_permissions(&current.0, user_id)?;
    load_project(&state, project_id, user_id, false).await?;
    load_fuzzer(&state, fuzzer_id, project_id, false).await?;
    let revision = load_revision(&state, revision_id, fuzzer_id, false).await?;
    Ok(Json(revision.into()))
}

#[derive(Debug, Deserialize)]
pub struct UpdateRevisionRequest {
    pub description: Option<String>,
}

/// `PATCH /…/revisions/{revision_id}`.
pub async fn update_revision(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path((user_id, project_id, fuzzer_id, revision_id)): Path<(Uuid, Uuid, Uuid, Uuid)>,
    Json(body): Json<UpdateRevisionRequest>,
) -> Result<Json<RevisionView>, GatewayError> {
    check_user_access_permissions(&current.0, user_id)?;
    load_project(&state, project_id, user_id, true).await?;
    load_fuzzer(&state, fuzzer_id, project_id, true).await?;
    let mut revision = load_revision(&state, revision_id, fuzzer_id, true).await?;
    if let Some(description) = body.description {
        revision.description = description;
    }
    state.db.revisions().update(&revision).await?;
    Ok(Json(revision.into()))
}

/// `DELETE /…/revisions/{revision_id}?action=Delete|Restore|Erase`.
pub async fn delete_revision(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path((user_id, project_id, fuzzer_id, revision_id)): Path<(Uuid, Uuid, Uuid, Uuid)>,
    Query(action): Query<DeletionAction>,
) -> Result<StatusCode, GatewayError> {
    check_user_access_permissions(&current.0, user_id)?;
    load_project(&state, project_id, user_id, false).await?;
    load_fuzzer(&state, fuzzer_id, project_id, false).await?;
    let mut revision = load_revision(&state, revision_id, fuzzer_id, false).await?;

    match action.action {
        DeletionActionKind::Delete => {
            revision.erasure_date =
                Some(chrono::Utc::now() + chrono::Duration::seconds(state.config.trashbin.expiration_seconds));
            revision.no_backup = action.no_backup.unwrap_or(revision.no_backup);
        }
        DeletionActionKind::Restore => {
            if revision.erasure_date.is_none() {
                return Err(GatewayError::code(ErrorCode::RevisionNotDeleted));
            }
            revision.erasure_date = None;
            if let Some(new_name) = action.new_name {
                revision.name = new_name;
            }
        }
        DeletionActionKind::Erase => {
            revision.erasure_date = Some(chrono::Utc::now());
        }
    }
    state.db.revisions().update(&revision).await?;
    Ok(StatusCode::OK)
}

/// `GET /…/fuzzers/{fuzzer_id}/active`.
pub async fn get_active_revision(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path((user_id, project_id, fuzzer_id)): Path<(Uuid, Uuid, Uuid)>,
) -> Result<Json<RevisionView>, GatewayError> {
    check_user_access_permissions(&current.0, user_id)?;
    load_project(&state, project_id, user_id, false).await?;
    let fuzzer = load_fuzzer(&state, fuzzer_id, project_id, false).await?;
    let active = fuzzer
        .active_revision
        .ok_or_else(|| GatewayError::code(ErrorCode::ActiveRevisionNotFound))?;
    Ok(Json(active.into()))
}

#[derive(Debug, Deserialize)]
pub struct SetActiveRevisionRequest {
    pub revision_id: Uuid,
}

/// `PUT /…/fuzzers/{fuzzer_id}/active` — points the fuzzer at a different
/// already-existing revision without touching its lifecycle state.
pub async fn set_active_revision(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path((user_id, project_id, fuzzer_id)): Path<(Uuid, Uuid, Uuid)>,
    Json(body): Json<SetActiveRevisionRequest>,
) -> Result<Json<RevisionView>, GatewayError> {
    check_user_access_permissions(&current.0, user_id)?;
    load_project(&state, project_id, user_id, true).await?;
    let fuzzer = load_fuzzer(&state, fuzzer_id, project_id, true).await?;
    let revision = load_revision(&state, body.revision_id, fuzzer_id, true).await?;

    if fuzzer.active_revision.as_ref().is_some_and(|r| r.id == revision.id) {
        return Err(GatewayError::code(ErrorCode::RevisionAlreadyRunning));
    }

    state
        .db
        .fuzzers()
        .set_active_revision(&fuzzer, Some(&revision), false, false)
        .await?;
    Ok(Json(revision.into()))
}

async fn check_start_preconditions(
    state: &AppState,
    fuzzer: &gateway_db::model::Fuzzer,
    project: &gateway_db::model::Project,
    revision: &Revision,
) -> Result<(), GatewayError> {
    let pool_id = project
        .pool_id
        .ok_or_else(|| GatewayError::code(ErrorCode::NoPoolToUse))?;
    let pool = state.pool_manager.get_pool(&pool_id.to_string()).await?;

    if !revision.has_uploaded_binaries() {
        return Err(GatewayError::code(ErrorCode::MustUploadBinaries));
    }

    let min = &state.config.fuzzer;
    if revision.cpu_usage < min.min_cpu_usage || revision.cpu_usage > pool.resources.fuzzer_max_cpu {
        return Err(GatewayError::code(ErrorCode::CpuUsageInvalid));
    }
    if revision.ram_usage < min.min_ram_usage {
        return Err(GatewayError::code(ErrorCode::RamUsageInvalid));
    }
    if revision.tmpfs_size < min.min_tmpfs_usage || revision.tmpfs_size > pool.resources.fuzzer_max_tmpfs {
        return Err(GatewayError::code(ErrorCode::TmpfsSizeInvalid));
    }
    if revision.ram_usage + revision.tmpfs_size > pool.resources.fuzzer_max_ram {
        return Err(GatewayError::code(ErrorCode::TotalRamUsageInvalid));
    }

    let image = state
        .db
        .images()
        .get_by_id(revision.image_id, Some(project.id))
        .await
        .map_err(|_| GatewayError::code(ErrorCode::ImageNotFound))?;
    if image.status != ImageStatus::Ready {
        return Err(GatewayError::code(ErrorCode::ImageNotReady));
    }
    if !image.engines.contains(&fuzzer.engine) {
        return Err(GatewayError::code(ErrorCode::FuzzerEngineMismatch));
    }
    let engine = state
        .db
        .engines()
        .get_by_id(fuzzer.engine.clone())
        .await
        .map_err(|_| GatewayError::code(ErrorCode::EngineNotFound))?;
    if !engine.langs.contains(&fuzzer.lang) {
        return Err(GatewayError::code(ErrorCode::EngineLangIncompatible));
    }
    Ok(())
}

/// `POST /…/revisions/{revision_id}/actions/start`.
pub async fn start_revision(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path((user_id, project_id, fuzzer_id, revision_id)): Path<(Uuid, Uuid, Uuid, Uuid)>,
) -> Result<Json<RevisionView>, GatewayError> {
    check_user_access_permissions(&current.0, user_id)?;
    let project = load_project(&state, project_id, user_id, true).await?;
    let fuzzer = load_fuzzer(&state, fuzzer_id, project_id, true).await?;
    let revision = load_revision(&state, revision_id, fuzzer_id, true).await?;

    if revision.status == RevisionStatus::Running {
        return Err(GatewayError::code(ErrorCode::RevisionAlreadyRunning));
    }
    if revision.health == Health::Err && revision.status != RevisionStatus::Unverified {
        return Err(GatewayError::code(ErrorCode::RevisionCanOnlyRestart));
    }

    check_start_preconditions(&state, &fuzzer, &project, &revision).await?;

    state
        .db
        .fuzzers()
        .set_active_revision(&fuzzer, Some(&revision), true, false)
        .await?;

    let pool_id = project.pool_id.expect("checked by check_start_preconditions").to_string();
    state
        .producers
        .start_fuzzer(&StartFuzzer {
            user_id,
            project_id,
            pool_id,
            fuzzer_id,
            fuzzer_rev: revision_id,
            fuzzer_engine: fuzzer.engine.clone(),
            fuzzer_lang: fuzzer.lang,
            cpu_usage: revision.cpu_usage,
            ram_usage: revision.ram_usage,
            tmpfs_size: revision.tmpfs_size,
            reset_state: true,
            is_verified: false,
            image_id: revision.image_id,
        })
        .await?;

    let refreshed = load_revision(&state, revision_id, fuzzer_id, false).await?;
    Ok(Json(refreshed.into()))
}

/// `POST /…/revisions/{revision_id}/actions/restart`.
pub async fn restart_revision(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path((user_id, project_id, fuzzer_id, revision_id)): Path<(Uuid, Uuid, Uuid, Uuid)>,
) -> Result<Json<RevisionView>, GatewayError> {
    check_user_access_permissions(&current.0, user_id)?;
    let project = load_project(&state, project_id, user_id, true).await?;
    let fuzzer = load_fuzzer(&state, fuzzer_id, project_id, true).await?;
    let revision = load_revision(&state, revision_id, fuzzer_id, true).await?;

    if revision.status == RevisionStatus::Unverified {
        return Err(GatewayError::code(ErrorCode::RevisionIsNotRunning));
    }
    check_start_preconditions(&state, &fuzzer, &project, &revision).await?;

    state
        .db
        .fuzzers()
        .set_active_revision(&fuzzer, Some(&revision), true, true)
        .await?;

    let pool_id = project.pool_id.expect("checked by check_start_preconditions").to_string();
    state
        .producers
        .start_fuzzer(&StartFuzzer {
            user_id,
            project_id,
            pool_id,
            fuzzer_id,
            fuzzer_rev: revision_id,
            fuzzer_engine: fuzzer.engine.clone(),
            fuzzer_lang: fuzzer.lang,
            cpu_usage: revision.cpu_usage,
            ram_usage: revision.ram_usage,
            tmpfs_size: revision.tmpfs_size,
            reset_state: true,
            is_verified: revision.is_verified,
            image_id: revision.image_id,
        })
        .await?;

    let refreshed = load_revision(&state, revision_id, fuzzer_id, false).await?;
    Ok(Json(refreshed.into()))
}

/// `POST /…/revisions/{revision_id}/actions/stop`.
pub async fn stop_revision(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path((user_id, project_id, fuzzer_id, revision_id)): Path<(Uuid, Uuid, Uuid, Uuid)>,
) -> Result<Json<RevisionView>, GatewayError> {
    check_user_access_permissions(&current.0, user_id)?;
    let project = load_project(&state, project_id, user_id, true).await?;
    let fuzzer = load_fuzzer(&state, fuzzer_id, project_id, true).await?;
    let revision = load_revision(&state, revision_id, fuzzer_id, true).await?;

    if !matches!(revision.status, RevisionStatus::Verifying | RevisionStatus::Running) {
        return Err(GatewayError::code(ErrorCode::RevisionCanOnlyRestart));
    }

    state
        .db
        .fuzzers()
        .set_active_revision(&fuzzer, Some(&revision), false, false)
        .await?;

    if let Some(pool_id) = project.pool_id {
        state
            .producers
            .stop_fuzzer(&StopFuzzer {
                pool_id: pool_id.to_string(),
                fuzzer_id,
                fuzzer_rev: revision_id,
            })
            .await?;
    }

    let refreshed = load_revision(&state, revision_id, fuzzer_id, false).await?;
    Ok(Json(refreshed.into()))
}

fn recompute_health(revision: &Revision) -> Health {
    let binaries_ok = revision.binaries.uploaded;
    let seeds_ok = revision.seeds.uploaded || revision.seeds.last_error.is_none();
    let config_ok = revision.config.uploaded || revision.config.last_error.is_none();
    if binaries_ok && seeds_ok && config_ok {
        Health::Ok
    } else {
        Health::Err
    }
}

async fn upload_guarded(
    state: &AppState,
    mut revision: Revision,
    upload: impl std::future::Future<Output = Result<(), GatewayError>>,
    field: impl Fn(&mut Revision) -> &mut UploadStatus,
) -> Result<Json<RevisionView>, GatewayError> {
    if revision.status != RevisionStatus::Unverified {
        return Err(GatewayError::code(ErrorCode::RevisionCanOnlyRestart));
    }

    match upload.await {
        Ok(()) => {
            let slot = field(&mut revision);
            slot.uploaded = true;
            slot.last_error = None;
        }
        Err(e) => {
            let slot = field(&mut revision);
            slot.uploaded = false;
            slot.last_error = Some(gateway_db::model::FieldError {
                code: e.error_code().as_str().to_string(),
                message: e.to_string(),
            });
            revision.health = Health::Err;
            state.db.revisions().update(&revision).await?;
            return Err(e);
        }
    }
    revision.health = recompute_health(&revision);
    state.db.revisions().update(&revision).await?;
    Ok(Json(revision.into()))
}

/// `PUT /…/revisions/{revision_id}/files/binaries`.
pub async fn upload_binaries(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path((user_id, project_id, fuzzer_id, revision_id)): Path<(Uuid, Uuid, Uuid, Uuid)>,
    bytes: Bytes,
) -> Result<Json<RevisionView>, GatewayError> {
    check_user_access_permissions(&current.0, user_id)?;
    load_project(&state, project_id, user_id, true).await?;
    load_fuzzer(&state, fuzzer_id, project_id, true).await?;
    let revision = load_revision(&state, revision_id, fuzzer_id, true).await?;
    let upload = state.storage.upload_fuzzer_binaries(fuzzer_id, revision_id, bytes);
    upload_guarded(&state, revision, upload, |r| &mut r.binaries).await
}

/// `PUT /…/revisions/{revision_id}/files/seeds`.
pub async fn upload_seeds(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path((user_id, project_id, fuzzer_id, revision_id)): Path<(Uuid, Uuid, Uuid, Uuid)>,
    bytes: Bytes,
) -> Result<Json<RevisionView>, GatewayError> {
    check_user_access_permissions(&current.0, user_id)?;
    load_project(&state, project_id, user_id, true).await?;
    load_fuzzer(&state, fuzzer_id, project_id, true).await?;
    let revision = load_revision(&state, revision_id, fuzzer_id, true).await?;
    let upload = state.storage.upload_fuzzer_seeds(fuzzer_id, revision_id, bytes);
    upload_guarded(&state, revision, upload, |r| &mut r.seeds).await
}

/// `PUT /…/revisions/{revision_id}/files/config`.
pub async fn upload_config(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path((user_id, project_id, fuzzer_id, revision_id)): Path<(Uuid, Uuid, Uuid, Uuid)>,
    bytes: Bytes,
) -> Result<Json<RevisionView>, GatewayError> {
    check_user_access_permissions(&current.0, user_id)?;
    load_project(&state, project_id, user_id, true).await?;
    load_fuzzer(&state, fuzzer_id, project_id, true).await?;
    let revision = load_revision(&state, revision_id, fuzzer_id, true).await?;
    let upload = state.storage.upload_fuzzer_config(fuzzer_id, revision_id, bytes);
    upload_guarded(&state, revision, upload, |r| &mut r.config).await
}

/// `GET /…/revisions/{revision_id}/files/{binaries|seeds|config}`.
pub async fn download_binaries(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path((user_id, project_id, fuzzer_id, revision_id)): Path<(Uuid, Uuid, Uuid, Uuid)>,
) -> Result<Bytes, GatewayError> {
    check_user_access_permissions(&current.0, user_id)?;
    load_project(&state, project_id, user_id, false).await?;
    load_fuzzer(&state, fuzzer_id, project_id, false).await?;
    load_revision(&state, revision_id, fuzzer_id, false).await?;
    state.storage.download_fuzzer_binaries(fuzzer_id, revision_id).await
}

pub async fn download_seeds(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path((user_id, project_id, fuzzer_id, revision_id)): Path<(Uuid, Uuid, Uuid, Uuid)>,
) -> Result<Bytes, GatewayError> {
    check_user_access_permissions(&current.0, user_id)?;
    load_project(&state, project_id, user_id, false).await?;
    load_fuzzer(&state, fuzzer_id, project_id, false).await?;
    load_revision(&state, revision_id, fuzzer_id, false).await?;
    state.storage.download_fuzzer_seeds(fuzzer_id, revision_id).await
}

pub async fn download_config(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path((user_id, project_id, fuzzer_id, revision_id)): Path<(Uuid, Uuid, Uuid, Uuid)>,
) -> Result<Bytes, GatewayError> {
    check_user_access_permissions(&current.0, user_id)?;
    load_project(&state, project_id, user_id, false).await?;
    load_fuzzer(&state, fuzzer_id, project_id, false).await?;
    load_revision(&state, revision_id, fuzzer_id, false).await?;
    state.storage.download_fuzzer_config(fuzzer_id, revision_id).await
}

#[derive(Debug, Deserialize)]
pub struct CopyCorpusRequest {
    pub src_rev_id: Uuid,
}

/// `PUT /…/revisions/{revision_id}/files/corpus` — copies another
/// revision's corpus onto this one.
pub async fn copy_corpus(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path((user_id, project_id, fuzzer_id, revision_id)): Path<(Uuid, Uuid, Uuid, Uuid)>,
    Json(body): Json<CopyCorpusRequest>,
) -> Result<StatusCode, GatewayError> {
    check_user_access_permissions(&current.0, user_id)?;
    load_project(&state, project_id, user_id, true).await?;
    load_fuzzer(&state, fuzzer_id, project_id, true).await?;

    if body.src_rev_id == revision_id {
        return Err(GatewayError::code(ErrorCode::CopySourceTargetSame));
    }
    let dst = state
        .db
        .revisions()
        .get_by_id(revision_id, Some(fuzzer_id), true)
        .await
        .map_err(|_| GatewayError::code(ErrorCode::TargetRevisionNotFound))?;
    if dst.status != RevisionStatus::Unverified {
        return Err(GatewayError::code(ErrorCode::CorpusOverwriteForbidden));
    }
    state
        .db
        .revisions()
        .get_by_id(body.src_rev_id, Some(fuzzer_id), true)
        .await
        .map_err(|_| GatewayError::code(ErrorCode::SourceRevisionNotFound))?;

    state
        .storage
        .copy_corpus_files(fuzzer_id, body.src_rev_id, revision_id)
        .await?;
    Ok(StatusCode::OK)
}

/// `GET /…/revisions/{revision_id}/files/corpus`.
pub async fn download_revision_corpus(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path((user_id, project_id, fuzzer_id, revision_id)): Path<(Uuid, Uuid, Uuid, Uuid)>,
) -> Result<Bytes, GatewayError> {
    check_user_access_permissions(&current.0, user_id)?;
    load_project(&state, project_id, user_id, false).await?;
    load_fuzzer(&state, fuzzer_id, project_id, false).await?;
    load_revision(&state, revision_id, fuzzer_id, false).await?;
    state.storage.download_fuzzer_corpus(fuzzer_id, revision_id).await
}

#[derive(Debug, Deserialize)]
pub struct UpdateResourcesRequest {
    pub cpu_usage: Option<i32>,
    pub ram_usage: Option<i32>,
    pub tmpfs_size: Option<i32>,
}

/// `PATCH /…/revisions/{revision_id}/resources` — only while `Unverified`.
pub async fn update_resources(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path((user_id, project_id, fuzzer_id, revision_id)): Path<(Uuid, Uuid, Uuid, Uuid)>,
    Json(body): Json<UpdateResourcesRequest>,
) -> Result<Json<RevisionView>, GatewayError> {
    check_user_access_permissions(&current.0, user_id)?;
    load_project(&state, project_id, user_id, true).await?;
    load_fuzzer(&state, fuzzer_id, project_id, true).await?;
    let mut revision = load_revision(&state, revision_id, fuzzer_id, true).await?;

    if revision.status != RevisionStatus::Unverified {
        return Err(GatewayError::code(ErrorCode::RevisionCanOnlyRestart));
    }
    if let Some(cpu) = body.cpu_usage {
        revision.cpu_usage = cpu;
    }
    if let Some(ram) = body.ram_usage {
        revision.ram_usage = ram;
    }
    if let Some(tmpfs) = body.tmpfs_size {
        revision.tmpfs_size = tmpfs;
    }
    state.db.revisions().update(&revision).await?;
    Ok(Json(revision.into()))
}

#[cfg(test)]
mod tests {
    use gateway_db::model::{EngineId, ImageStatus, LangId};

    use super::*;
    use crate::handlers::fuzzers::CreateFuzzerRequest;
    use crate::test_support::test_state;

    async fn seed(state: &AppState) -> (Uuid, Uuid, Uuid, Uuid) {
        let owner = state
            .db
            .users()
            .create("owner", "Owner", "hash", true, false, false, false, "owner@example.test")
            .await
            .unwrap();
        let project = state.db.projects().create("proj", "d", owner.id, None).await.unwrap();
        state.db.engines().create(EngineId::Libfuzzer, "libFuzzer", &[LangId::Cpp]).await.unwrap();
        let (_, Json(fuzzer)) = super::super::fuzzers::create_fuzzer(
            State(state.clone()),
            Extension(CurrentUser(owner.clone())),
            Path((owner.id, project.id)),
            Json(CreateFuzzerRequest {
                name: "fuzzer-a".into(),
                description: "d".into(),
                engine: EngineId::Libfuzzer,
                lang: LangId::Cpp,
                ci_integration: false,
            }),
        )
        .await
        .unwrap();
        let image = state
            .db
            .images()
            .create("img", "d", Some(project.id), &[EngineId::Libfuzzer], ImageStatus::Ready)
            .await
            .unwrap();
        (owner.id, project.id, fuzzer.id, image.id)
    }

    #[tokio::test]
    async fn create_revision_rejects_engine_mismatch() {
        let state = test_state();
        let (user_id, project_id, fuzzer_id, _) = seed(&state).await;
        let owner = state.db.users().get_by_id(user_id).await.unwrap();
        let other_image = state
            .db
            .images()
            .create("img2", "d", Some(project_id), &[EngineId::CargoFuzz], ImageStatus::Ready)
            .await
            .unwrap();

        let err = create_revision(
            State(state),
            Extension(CurrentUser(owner)),
            Path((user_id, project_id, fuzzer_id)),
            Json(CreateRevisionRequest {
                name: "rev-1".into(),
                description: "d".into(),
                image_id: other_image.id,
                cpu_usage: 100,
                ram_usage: 256,
                tmpfs_size: 0,
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.error_code().as_str(), "E_FUZZER_ENGINE_MISMATCH");
    }

    #[tokio::test]
    async fn create_revision_then_get_round_trips() {
        let state = test_state();
        let (user_id, project_id, fuzzer_id, image_id) = seed(&state).await;
        let owner = state.db.users().get_by_id(user_id).await.unwrap();

        let (_, Json(created)) = create_revision(
            State(state.clone()),
            Extension(CurrentUser(owner.clone())),
            Path((user_id, project_id, fuzzer_id)),
            Json(CreateRevisionRequest {
                name: "rev-1".into(),
                description: "d".into(),
                image_id,
                cpu_usage: 100,
                ram_usage: 256,
                tmpfs_size: 0,
            }),
        )
        .await
        .unwrap();

        let Json(fetched) = get_revision(
            State(state),
            Extension(CurrentUser(owner)),
            Path((user_id, project_id, fuzzer_id, created.id)),
        )
        .await
        .unwrap();
        assert_eq!(fetched.name, "rev-1");
    }

    #[tokio::test]
    async fn start_revision_without_pool_is_rejected() {
        let state = test_state();
        let (user_id, project_id, fuzzer_id, image_id) = seed(&state).await;
        let owner = state.db.users().get_by_id(user_id).await.unwrap();

        let (_, Json(revision)) = create_revision(
            State(state.clone()),
            Extension(CurrentUser(owner.clone())),
            Path((user_id, project_id, fuzzer_id)),
            Json(CreateRevisionRequest {
                name: "rev-1".into(),
                description: "d".into(),
                image_id,
                cpu_usage: 100,
                ram_usage: 256,
                tmpfs_size: 0,
            }),
        )
        .await
        .unwrap();

        let err = start_revision(
            State(state),
            Extension(CurrentUser(owner)),
            Path((user_id, project_id, fuzzer_id, revision.id)),
        )
        .await
        .unwrap_err();
        assert_eq!(err.error_code().as_str(), "E_NO_POOL_TO_USE");
    }

    #[tokio::test]
    async fn copy_corpus_rejects_same_source_and_target() {
        let state = test_state();
        let (user_id, project_id, fuzzer_id, image_id) = seed(&state).await;
        let owner = state.db.users().get_by_id(user_id).await.unwrap();

        let (_, Json(revision)) = create_revision(
            State(state.clone()),
            Extension(CurrentUser(owner.clone())),
            Path((user_id, project_id, fuzzer_id)),
            Json(CreateRevisionRequest {
                name: "rev-1".into(),
                description: "d".into(),
                image_id,
                cpu_usage: 100,
                ram_usage: 256,
                tmpfs_size: 0,
            }),
        )
        .await
        .unwrap();

        let err = copy_corpus(
            State(state),
            Extension(CurrentUser(owner)),
            Path((user_id, project_id, fuzzer_id, revision.id)),
            Json(CopyCorpusRequest { src_rev_id: revision.id }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.error_code().as_str(), "E_COPY_SOURCE_TARGET_SAME");
    }
}
