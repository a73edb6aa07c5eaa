//! `/fuzzers/{fuzzer_id}/{statistics,crashes}` and the per-revision
//! variants. Statistics are discriminated by engine family: a libfuzzer
//! fuzzer's revisions only ever produce `LibFuzzerStatistics` rows, an AFL
//! one only `AflStatistics` rows.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use gateway_db::model::{AflStatistics, Crash, LibFuzzerStatistics, Paginator, StatisticsGroupBy};
use gateway_error::{ErrorCode, GatewayError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::session::CurrentUser;
use crate::path::{check_user_access_permissions, load_fuzzer, load_project, load_revision, load_user};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StatisticsQuery {
    #[serde(default)]
    pub pg_num: u32,
    #[serde(default = "default_page_size")]
    pub pg_size: u32,
    pub group_by: StatisticsGroupBy,
    pub date_begin: DateTime<Utc>,
    pub date_end: Option<DateTime<Utc>>,
}

fn default_page_size() -> u32 {
    100
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum StatisticsView {
    LibFuzzer(Vec<LibFuzzerStatistics>),
    Afl(Vec<AflStatistics>),
}

async fn load_fuzzer_scoped(
    state: &AppState,
    current: &CurrentUser,
    user_id: Uuid,
    project_id: Uuid,
    fuzzer_id: Uuid,
) -> Result<gateway_db::model::Fuzzer, GatewayError> {
    check_user_access_permissions(&current.0, user_id)?;
    load_user(state, user_id, false).await?;
    let project = load_project(state, project_id, user_id, false).await?;
    load_fuzzer(state, fuzzer_id, project.id, false).await
}

async fn fetch_statistics(
    state: &AppState,
    fuzzer: &gateway_db::model::Fuzzer,
    revision_id: Option<Uuid>,
    page: &StatisticsQuery,
) -> Result<StatisticsView, GatewayError> {
    let paginator = Paginator::new(page.pg_num, page.pg_size);
    if fuzzer.engine.clone().is_libfuzzer() {
        let rows = state
            .db
            .statistics_libfuzzer()
            .list(paginator, Some(fuzzer.id), revision_id, page.group_by, page.date_begin, page.date_end)
            .await?;
        Ok(StatisticsView::LibFuzzer(rows))
    } else if fuzzer.engine.clone().is_afl() {
        let rows = state
            .db
            .statistics_afl()
            .list(paginator, Some(fuzzer.id), revision_id, page.group_by, page.date_begin, page.date_end)
            .await?;
        Ok(StatisticsView::Afl(rows))
    } else {
        Err(GatewayError::code(ErrorCode::WrongRequest))
    }
}

pub async fn fuzzer_statistics(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path((user_id, project_id, fuzzer_id)): Path<(Uuid, Uuid, Uuid)>,
    Query(page): Query<StatisticsQuery>,
) -> Result<Json<StatisticsView>, GatewayError> {
    let fuzzer = load_fuzzer_scoped(&state, &current, user_id, project_id, fuzzer_id).await?;
    let stats = fetch_statistics(&state, &fuzzer, None, &page).await?;
    Ok(Json(stats))
}

pub async fn revision_statistics(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path((user_id, project_id, fuzzer_id, revision_id)): Path<(Uuid, Uuid, Uuid, Uuid)>,
    Query(page): Query<StatisticsQuery>,
) -> Result<Json<StatisticsView>, GatewayError> {
    let fuzzer = load_fuzzer_scoped(&state, &current, user_id, project_id, fuzzer_id).await?;
    load_revision(&state, revision_id, fuzzer.id, false).await?;
    let stats = fetch_statistics(&state, &fuzzer, Some(revision_id), &page).await?;
    Ok(Json(stats))
}

#[derive(Debug, Deserialize)]
pub struct CrashesQuery {
    #[serde(default)]
    pub pg_num: u32,
    #[serde(default = "default_page_size")]
    pub pg_size: u32,
    pub date_begin: Option<DateTime<Utc>>,
    pub date_end: Option<DateTime<Utc>>,
    pub archived: Option<bool>,
}

async fn fetch_crashes(
    state: &AppState,
    fuzzer_id: Uuid,
    revision_id: Option<Uuid>,
    page: &CrashesQuery,
) -> Result<Vec<Crash>, GatewayError> {
    let paginator = Paginator::new(page.pg_num, page.pg_size);
    state
        .db
        .crashes()
        .list(paginator, Some(fuzzer_id), revision_id, page.date_begin, page.date_end, page.archived)
        .await
}

pub async fn fuzzer_crashes(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path((user_id, project_id, fuzzer_id)): Path<(Uuid, Uuid, Uuid)>,
    Query(page): Query<CrashesQuery>,
) -> Result<Json<Vec<Crash>>, GatewayError> {
    let fuzzer = load_fuzzer_scoped(&state, &current, user_id, project_id, fuzzer_id).await?;
    let crashes = fetch_crashes(&state, fuzzer.id, None, &page).await?;
    Ok(Json(crashes))
}

pub async fn revision_crashes(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path((user_id, project_id, fuzzer_id, revision_id)): Path<(Uuid, Uuid, Uuid, Uuid)>,
    Query(page): Query<CrashesQuery>,
) -> Result<Json<Vec<Crash>>, GatewayError> {
    let fuzzer = load_fuzzer_scoped(&state, &current, user_id, project_id, fuzzer_id).await?;
    load_revision(&state, revision_id, fuzzer.id, false).await?;
    let crashes = fetch_crashes(&state, fuzzer.id, Some(revision_id), &page).await?;
    Ok(Json(crashes))
}

pub async fn get_crash(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path((user_id, project_id, fuzzer_id, crash_id)): Path<(Uuid, Uuid, Uuid, Uuid)>,
) -> Result<Json<Crash>, GatewayError> {
    let fuzzer = load_fuzzer_scoped(&state, &current, user_id, project_id, fuzzer_id).await?;
    let crash = state
        .db
        .crashes()
        .get(crash_id, Some(fuzzer.id), None)
        .await
        .map_err(|_| GatewayError::code(ErrorCode::CrashNotFound))?;
    Ok(Json(crash))
}

#[derive(Debug, Deserialize)]
pub struct ArchiveCrashRequest {
    pub archived: bool,
}

pub async fn archive_crash(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path((user_id, project_id, fuzzer_id, crash_id)): Path<(Uuid, Uuid, Uuid, Uuid)>,
    Json(body): Json<ArchiveCrashRequest>,
) -> Result<StatusCode, GatewayError> {
    let fuzzer = load_fuzzer_scoped(&state, &current, user_id, project_id, fuzzer_id).await?;
    let found = state
        .db
        .crashes()
        .update_archived(crash_id, fuzzer.id, body.archived)
        .await?;
    if !found {
        return Err(GatewayError::code(ErrorCode::CrashNotFound));
    }
    Ok(StatusCode::OK)
}

#[cfg(test)]
mod tests {
    use gateway_db::model::{EngineId, LangId};

    use super::*;
    use crate::handlers::fuzzers::CreateFuzzerRequest;

    async fn seed(state: &AppState) -> (Uuid, Uuid, Uuid) {
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
        (owner.id, project.id, fuzzer.id)
    }

    #[tokio::test]
    async fn fuzzer_statistics_returns_libfuzzer_variant() {
        use crate::test_support::test_state;

        let state = test_state();
        let (owner_id, project_id, fuzzer_id) = seed(&state).await;
        let owner = state.db.users().get_by_id(owner_id).await.unwrap();

        let Json(stats) = fuzzer_statistics(
            State(state),
            Extension(CurrentUser(owner)),
            Path((owner_id, project_id, fuzzer_id)),
            Query(StatisticsQuery {
                pg_num: 0,
                pg_size: 100,
                group_by: StatisticsGroupBy::Day,
                date_begin: Utc::now() - chrono::Duration::days(1),
                date_end: None,
            }),
        )
        .await
        .unwrap();
        assert!(matches!(stats, StatisticsView::LibFuzzer(rows) if rows.is_empty()));
    }

    #[tokio::test]
    async fn get_crash_rejects_unknown_id() {
        use crate::test_support::test_state;

        let state = test_state();
        let (owner_id, project_id, fuzzer_id) = seed(&state).await;
        let owner = state.db.users().get_by_id(owner_id).await.unwrap();

        let err = get_crash(
            State(state),
            Extension(CurrentUser(owner)),
            Path((owner_id, project_id, fuzzer_id, Uuid::new_v4())),
        )
        .await
        .unwrap_err();
        assert_eq!(err.error_code().as_str(), "E_CRASH_NOT_FOUND");
    }

    #[tokio::test]
    async fn archive_crash_rejects_unknown_id() {
        use crate::test_support::test_state;

        let state = test_state();
        let (owner_id, project_id, fuzzer_id) = seed(&state).await;
        let owner = state.db.users().get_by_id(owner_id).await.unwrap();

        let err = archive_crash(
            State(state),
            Extension(CurrentUser(owner)),
            Path((owner_id, project_id, fuzzer_id, Uuid::new_v4())),
            Json(ArchiveCrashRequest { archived: true }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.error_code().as_str(), "E_CRASH_NOT_FOUND");
    }
}
