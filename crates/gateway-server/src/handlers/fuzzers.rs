//! `/users/{user_id}/projects/{project_id}/fuzzers` CRUD, trash bin, and
//! corpus download for the active revision.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use gateway_db::model::{EngineId, Fuzzer, LangId, Paginator, RemovalState};
use gateway_error::{ErrorCode, GatewayError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::handlers::projects::CountResponse;
use crate::handlers::revisions::RevisionView;
use crate::handlers::users::{clamp_page_size, DeletionAction, DeletionActionKind, PageQuery};
use crate::middleware::session::CurrentUser;
use crate::path::{check_user_access_permissions, load_fuzzer, load_project};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct FuzzerView {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub project_id: Uuid,
    pub engine: EngineId,
    pub lang: LangId,
    pub ci_integration: bool,
    pub created: chrono::DateTime<chrono::Utc>,
    pub active_revision: Option<RevisionView>,
    pub erasure_date: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<Fuzzer> for FuzzerView {
    fn from(f: Fuzzer) -> Self {
        Self {
            id: f.id,
            name: f.name,
            description: f.description,
            project_id: f.project_id,
            engine: f.engine,
            lang: f.lang,
            ci_integration: f.ci_integration,
            created: f.created,
            active_revision: f.active_revision.map(RevisionView::from),
            erasure_date: f.erasure_date,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateFuzzerRequest {
    pub name: String,
    pub description: String,
    pub engine: EngineId,
    pub lang: LangId,
    #[serde(default)]
    pub ci_integration: bool,
}

/// `POST /…/fuzzers`.
pub async fn create_fuzzer(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path((user_id, project_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<CreateFuzzerRequest>,
) -> Result<(StatusCode, Json<FuzzerView>), GatewayError> {
    check_user_access_permissions(&current.0, user_id)?;
    load_project(&state, project_id, user_id, true).await?;

    let engine = state
        .db
        .engines()
        .get_by_id(body.engine.clone())
        .await
        .map_err(|_| GatewayError::code(ErrorCode::EngineNotFound))?;
    if !engine.langs.contains(&body.lang) {
        return Err(GatewayError::code(ErrorCode::EngineLangIncompatible));
    }

    if state.db.fuzzers().get_by_name(&body.name, project_id).await.is_ok() {
        return Err(GatewayError::code(ErrorCode::FuzzerExists));
    }

    let fuzzer = state
        .db
        .fuzzers()
        .create(&body.name, &body.description, project_id, body.engine, body.lang, body.ci_integration)
        .await?;
    Ok((StatusCode::CREATED, Json(fuzzer.into())))
}

/// `GET /…/fuzzers`.
pub async fn list_fuzzers(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path((user_id, project_id)): Path<(Uuid, Uuid)>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<FuzzerView>>, GatewayError> {
    check_user_access_permissions(&current.0, user_id)?;
    load_project(&state, project_id, user_id, false).await?;
    let page_size = clamp_page_size(page.pg_size)?;
    let removal_state = page.removal_state.map(RemovalState::from);
    let fuzzers = state
        .db
        .fuzzers()
        .list(Some(Paginator::new(page.pg_num, page_size)), Some(project_id), removal_state)
        .await?;
    Ok(Json(fuzzers.into_iter().map(FuzzerView::from).collect()))
}

/// `GET /…/fuzzers/{fuzzer_id}`.
pub async fn get_fuzzer(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path((user_id, project_id, fuzzer_id)): Path<(Uuid, Uuid, Uuid)>,
) -> Result<Json<FuzzerView>, GatewayError> {
    check_user_access_permissions(&current.0, user_id)?;
    load_project(&state, project_id, user_id, false).await?;
    let fuzzer = load_fuzzer(&state, fuzzer_id, project_id, false).await?;
    Ok(Json(fuzzer.into()))
}

#[derive(Debug, Deserialize)]
pub struct UpdateFuzzerRequest {
    pub description: Option<String>,
    pub ci_integration: Option<bool>,
}

/// `PATCH /…/fuzzers/{fuzzer_id}`.
pub async fn update_fuzzer(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path((user_id, project_id, fuzzer_id)): Path<(Uuid, Uuid, Uuid)>,
    Json(body): Json<UpdateFuzzerRequest>,
) -> Result<Json<FuzzerView>, GatewayError> {
    check_user_access_permissions(&current.0, user_id)?;
    load_project(&state, project_id, user_id, true).await?;
    let mut fuzzer = load_fuzzer(&state, fuzzer_id, project_id, true).await?;
    if let Some(description) = body.description {
        fuzzer.description = description;
    }
    if let Some(ci) = body.ci_integration {
        fuzzer.ci_integration = ci;
    }
    state.db.fuzzers().update(&fuzzer).await?;
    Ok(Json(fuzzer.into()))
}

/// `DELETE /…/fuzzers/{fuzzer_id}?action=Delete|Restore|Erase`.
pub async fn delete_fuzzer(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path((user_id, project_id, fuzzer_id)): Path<(Uuid, Uuid, Uuid)>,
    Query(action): Query<DeletionAction>,
) -> Result<StatusCode, GatewayError> {
    check_user_access_permissions(&current.0, user_id)?;
    load_project(&state, project_id, user_id, false).await?;
    let mut fuzzer = load_fuzzer(&state, fuzzer_id, project_id, false).await?;

    match action.action {
        DeletionActionKind::Delete => {
            if let Some(revision) = &fuzzer.active_revision {
                if matches!(revision.status, gateway_db::model::RevisionStatus::Verifying | gateway_db::model::RevisionStatus::Running) {
                    state.db.fuzzers().set_active_revision(&fuzzer, Some(revision), false, false).await?;
                }
            }
            fuzzer.erasure_date =
                Some(chrono::Utc::now() + chrono::Duration::seconds(state.config.trashbin.expiration_seconds));
            fuzzer.no_backup = action.no_backup.unwrap_or(fuzzer.no_backup);
        }
        DeletionActionKind::Restore => {
            if fuzzer.erasure_date.is_none() {
                return Err(GatewayError::code(ErrorCode::FuzzerNotDeleted));
            }
            fuzzer.erasure_date = None;
            if let Some(new_name) = action.new_name {
                fuzzer.name = new_name;
            }
        }
        DeletionActionKind::Erase => {
            fuzzer.erasure_date = Some(chrono::Utc::now());
        }
    }
    state.db.fuzzers().update(&fuzzer).await?;
    Ok(StatusCode::OK)
}

/// `GET /…/fuzzers/{fuzzer_id}/trashbin`.
pub async fn trashbin_list(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path((user_id, project_id)): Path<(Uuid, Uuid)>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<FuzzerView>>, GatewayError> {
    check_user_access_permissions(&current.0, user_id)?;
    load_project(&state, project_id, user_id, false).await?;
    let page_size = clamp_page_size(page.pg_size)?;
    let fuzzers = state
        .db
        .fuzzers()
        .trashbin_list(Paginator::new(page.pg_num, page_size), project_id)
        .await?;
    Ok(Json(fuzzers.into_iter().map(FuzzerView::from).collect()))
}

/// `GET /…/fuzzers/trashbin/count`.
pub async fn trashbin_count(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path((user_id, project_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<CountResponse>, GatewayError> {
    check_user_access_permissions(&current.0, user_id)?;
    load_project(&state, project_id, user_id, false).await?;
    let count = state.db.fuzzers().trashbin_count(project_id).await?;
    Ok(Json(CountResponse { count }))
}

/// `DELETE /…/fuzzers/trashbin/{fuzzer_id}` — erases one trashed fuzzer
/// (and its revisions) permanently.
pub async fn trashbin_erase_one(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path((user_id, project_id, fuzzer_id)): Path<(Uuid, Uuid, Uuid)>,
) -> Result<Json<CountResponse>, GatewayError> {
    check_user_access_permissions(&current.0, user_id)?;
    load_project(&state, project_id, user_id, false).await?;
    let fuzzer = load_fuzzer(&state, fuzzer_id, project_id, false).await?;
    if fuzzer.erasure_date.is_none() {
        return Err(GatewayError::code(ErrorCode::FuzzerNotInTrashbin));
    }
    let purged = state.db.fuzzers().trashbin_empty(project_id, Some(fuzzer_id)).await?;
    Ok(Json(CountResponse { count: purged as i64 }))
}

/// `GET /…/fuzzers/{fuzzer_id}/files/corpus` — downloads the active
/// revision's corpus archive.
pub async fn download_corpus(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path((user_id, project_id, fuzzer_id)): Path<(Uuid, Uuid, Uuid)>,
) -> Result<Bytes, GatewayError> {
    check_user_access_permissions(&current.0, user_id)?;
    load_project(&state, project_id, user_id, false).await?;
    let fuzzer = load_fuzzer(&state, fuzzer_id, project_id, false).await?;
    let active = fuzzer
        .active_revision
        .ok_or_else(|| GatewayError::code(ErrorCode::ActiveRevisionNotFound))?;
    let bytes = state.storage.download_fuzzer_corpus(fuzzer_id, active.id).await?;
    Ok(bytes)
}

async fn active_revision_id(state: &AppState, project_id: Uuid, fuzzer_id: Uuid) -> Result<Uuid, GatewayError> {
    let fuzzer = load_fuzzer(state, fuzzer_id, project_id, false).await?;
    Ok(fuzzer
        .active_revision
        .ok_or_else(|| GatewayError::code(ErrorCode::ActiveRevisionNotFound))?
        .id)
}

/// `POST /…/fuzzers/{fuzzer_id}/actions/start` — starts the active revision.
pub async fn start_fuzzer(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path((user_id, project_id, fuzzer_id)): Path<(Uuid, Uuid, Uuid)>,
) -> Result<Json<RevisionView>, GatewayError> {
    let revision_id = active_revision_id(&state, project_id, fuzzer_id).await?;
    super::revisions::start_revision(
        State(state),
        Extension(current),
        Path((user_id, project_id, fuzzer_id, revision_id)),
    )
    .await
}

/// `POST /…/fuzzers/{fuzzer_id}/actions/restart` — restarts the active revision.
pub async fn restart_fuzzer(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path((user_id, project_id, fuzzer_id)): Path<(Uuid, Uuid, Uuid)>,
) -> Result<Json<RevisionView>, GatewayError> {
    let revision_id = active_revision_id(&state, project_id, fuzzer_id).await?;
    super::revisions::restart_revision(
        State(state),
        Extension(current),
        Path((user_id, project_id, fuzzer_id, revision_id)),
    )
    .await
}

/// `POST /…/fuzzers/{fuzzer_id}/actions/stop` — stops the active revision.
pub async fn stop_fuzzer(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path((user_id, project_id, fuzzer_id)): Path<(Uuid, Uuid, Uuid)>,
) -> Result<Json<RevisionView>, GatewayError> {
    let revision_id = active_revision_id(&state, project_id, fuzzer_id).await?;
    super::revisions::stop_revision(
        State(state),
        Extension(current),
        Path((user_id, project_id, fuzzer_id, revision_id)),
    )
    .await
}

#[cfg(test)]
mod tests {
    use gateway_db::model::{EngineId, LangId};

    use super::*;
    use crate::handlers::users::PageQuery;
    use crate::test_support::test_state;

    async fn seed_owner_and_project(state: &AppState) -> (Uuid, Uuid) {
        let owner = state
            .db
            .users()
            .create("owner", "Owner", "hash", true, false, false, false, "owner@example.test")
            .await
            .unwrap();
        let project = state.db.projects().create("proj", "a project", owner.id, None).await.unwrap();
        state.db.engines().create(EngineId::Libfuzzer, "libFuzzer", &[LangId::Cpp]).await.unwrap();
        (owner.id, project.id)
    }

    #[tokio::test]
    async fn create_fuzzer_rejects_incompatible_lang() {
        let state = test_state();
        let (owner_id, project_id) = seed_owner_and_project(&state).await;
        let current = Extension(CurrentUser(state.db.users().get_by_id(owner_id).await.unwrap()));

        let err = create_fuzzer(
            State(state),
            current,
            Path((owner_id, project_id)),
            Json(CreateFuzzerRequest {
                name: "fuzzer-a".into(),
                description: "d".into(),
                engine: EngineId::Libfuzzer,
                lang: LangId::Rust,
                ci_integration: false,
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.error_code().as_str(), "E_ENGINE_LANG_INCOMPATIBLE");
    }

    #[tokio::test]
    async fn create_fuzzer_then_get_round_trips() {
        let state = test_state();
        let (owner_id, project_id) = seed_owner_and_project(&state).await;
        let owner = state.db.users().get_by_id(owner_id).await.unwrap();

        let (status, Json(created)) = create_fuzzer(
            State(state.clone()),
            Extension(CurrentUser(owner.clone())),
            Path((owner_id, project_id)),
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
        assert_eq!(status, StatusCode::CREATED);

        let Json(fetched) = get_fuzzer(
            State(state),
            Extension(CurrentUser(owner)),
            Path((owner_id, project_id, created.id)),
        )
        .await
        .unwrap();
        assert_eq!(fetched.name, "fuzzer-a");
    }

    #[tokio::test]
    async fn create_fuzzer_rejects_duplicate_name() {
        let state = test_state();
        let (owner_id, project_id) = seed_owner_and_project(&state).await;
        let owner = state.db.users().get_by_id(owner_id).await.unwrap();

        let request = || {
            Json(CreateFuzzerRequest {
                name: "fuzzer-a".into(),
                description: "d".into(),
                engine: EngineId::Libfuzzer,
                lang: LangId::Cpp,
                ci_integration: false,
            })
        };
        create_fuzzer(
            State(state.clone()),
            Extension(CurrentUser(owner.clone())),
            Path((owner_id, project_id)),
            request(),
        )
        .await
        .unwrap();

        let err = create_fuzzer(
            State(state),
            Extension(CurrentUser(owner)),
            Path((owner_id, project_id)),
            request(),
        )
        .await
        .unwrap_err();
        assert_eq!(err.error_code().as_str(), "E_FUZZER_EXISTS");
    }

    #[tokio::test]
    async fn other_users_cannot_create_fuzzers_for_owner() {
        let state = test_state();
        let (owner_id, project_id) = seed_owner_and_project(&state).await;
        let stranger = state
            .db
            .users()
            .create("stranger", "Stranger", "hash", true, false, false, false, "stranger@example.test")
            .await
            .unwrap();

        let err = create_fuzzer(
            State(state),
            Extension(CurrentUser(stranger)),
            Path((owner_id, project_id)),
            Json(CreateFuzzerRequest {
                name: "fuzzer-a".into(),
                description: "d".into(),
                engine: EngineId::Libfuzzer,
                lang: LangId::Cpp,
                ci_integration: false,
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.error_code().as_str(), "E_ACCESS_DENIED");
    }

    #[tokio::test]
    async fn list_fuzzers_rejects_page_size_outside_bounds() {
        let state = test_state();
        let (owner_id, project_id) = seed_owner_and_project(&state).await;
        let owner = state.db.users().get_by_id(owner_id).await.unwrap();

        let err = list_fuzzers(
            State(state),
            Extension(CurrentUser(owner)),
            Path((owner_id, project_id)),
            Query(PageQuery { pg_num: 0, pg_size: 1, removal_state: None }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.error_code().as_str(), "E_WRONG_REQUEST");
    }
}
