//! `/users/{user_id}/projects` CRUD and trash-bin lifecycle.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use gateway_db::model::{Paginator, Project, RemovalState};
use gateway_error::{ErrorCode, GatewayError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::handlers::users::{clamp_page_size, DeletionAction, DeletionActionKind, PageQuery};
use crate::middleware::session::CurrentUser;
use crate::path::{check_client_is_not_admin, check_user_access_permissions, load_project, load_user};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ProjectView {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub owner_id: Uuid,
    pub created: chrono::DateTime<chrono::Utc>,
    pub pool_id: Option<Uuid>,
    pub erasure_date: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<Project> for ProjectView {
    fn from(p: Project) -> Self {
        Self {
            id: p.id,
            name: p.name,
            description: p.description,
            owner_id: p.owner_id,
            created: p.created,
            pool_id: p.pool_id,
            erasure_date: p.erasure_date,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
    pub description: String,
}

/// `POST /users/{user_id}/projects` — owner only; client account required.
pub async fn create_project(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(user_id): Path<Uuid>,
    Json(body): Json<CreateProjectRequest>,
) -> Result<(StatusCode, Json<ProjectView>), GatewayError> {
    check_user_access_permissions(&current.0, user_id)?;
    let owner = load_user(&state, user_id, true).await?;
    check_client_is_not_admin(&owner)?;

    if state.db.projects().get_by_name(&body.name, user_id).await.is_ok() {
        return Err(GatewayError::code(ErrorCode::ProjectExists));
    }

    let project = state
        .db
        .projects()
        .create(&body.name, &body.description, user_id, None)
        .await?;
    Ok((StatusCode::CREATED, Json(project.into())))
}

/// `GET /users/{user_id}/projects`.
pub async fn list_projects(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(user_id): Path<Uuid>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<ProjectView>>, GatewayError> {
    check_user_access_permissions(&current.0, user_id)?;
    let page_size = clamp_page_size(page.pg_size)?;
    let removal_state = page.removal_state.map(RemovalState::from);
    let projects = state
        .db
        .projects()
        .list(Paginator::new(page.pg_num, page_size), Some(user_id), removal_state)
        .await?;
    Ok(Json(projects.into_iter().map(ProjectView::from).collect()))
}

/// `GET /users/{user_id}/projects/{project_id}`.
pub async fn get_project(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path((user_id, project_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ProjectView>, GatewayError> {
    check_user_access_permissions(&current.0, user_id)?;
    let project = load_project(&state, project_id, user_id, false).await?;
    Ok(Json(project.into()))
}

#[derive(Debug, Deserialize)]
pub struct UpdateProjectRequest {
    pub description: Option<String>,
    pub pool_id: Option<Uuid>,
}

/// `PATCH /users/{user_id}/projects/{project_id}`.
pub async fn update_project(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path((user_id, project_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<UpdateProjectRequest>,
) -> Result<Json<ProjectView>, GatewayError> {
    check_user_access_permissions(&current.0, user_id)?;
    let mut project = load_project(&state, project_id, user_id, true).await?;
    if let Some(description) = body.description {
        project.description = description;
    }
    if let Some(pool_id) = body.pool_id {
        project.pool_id = Some(pool_id);
    }
    state.db.projects().update(&project).await?;
    Ok(Json(project.into()))
}

/// `DELETE /users/{user_id}/projects/{project_id}?action=Delete|Restore|Erase`.
///
/// Deleting stops any running revisions under the project but leaves them
/// addressable; it never erases children directly (that is
/// [`empty_trashbin`]'s job).
pub async fn delete_project(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path((user_id, project_id)): Path<(Uuid, Uuid)>,
    Query(action): Query<DeletionAction>,
) -> Result<StatusCode, GatewayError> {
    check_user_access_permissions(&current.0, user_id)?;
    let mut project = load_project(&state, project_id, user_id, false).await?;

    match action.action {
        DeletionActionKind::Delete => {
            state.db.revisions().stop_all(project.id).await?;
            project.erasure_date =
                Some(chrono::Utc::now() + chrono::Duration::seconds(state.config.trashbin.expiration_seconds));
            project.no_backup = action.no_backup.unwrap_or(project.no_backup);
        }
        DeletionActionKind::Restore => {
            if project.erasure_date.is_none() {
                return Err(GatewayError::code(ErrorCode::ProjectNotDeleted));
            }
            project.erasure_date = None;
            if let Some(new_name) = action.new_name {
                project.name = new_name;
            }
        }
        DeletionActionKind::Erase => {
            project.erasure_date = Some(chrono::Utc::now());
        }
    }
    state.db.projects().update(&project).await?;
    Ok(StatusCode::OK)
}

/// `DELETE /users/{user_id}/pools/trashbin` equivalent for projects: permanently
/// purges every trashed/erasing project (and cascades to fuzzers/revisions).
pub async fn empty_trashbin(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<CountResponse>, GatewayError> {
    check_user_access_permissions(&current.0, user_id)?;
    let purged = state.db.projects().trashbin_empty(user_id).await?;
    Ok(Json(CountResponse { count: purged as i64 }))
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_state;

    async fn make_owner(state: &AppState) -> gateway_db::model::User {
        state
            .db
            .users()
            .create("owner", "Owner", "hash", true, false, false, false, "owner@example.test")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn create_project_rejects_admin_account() {
        let state = test_state();
        let admin = state
            .db
            .users()
            .create("admin", "Admin", "hash", true, false, true, false, "admin@example.test")
            .await
            .unwrap();
        let admin_id = admin.id;

        let err = create_project(
            State(state),
            Extension(CurrentUser(admin)),
            Path(admin_id),
            Json(CreateProjectRequest { name: "proj".into(), description: "d".into() }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.error_code().as_str(), "E_CLIENT_ACCOUNT_REQUIRED");
    }

    #[tokio::test]
    async fn create_project_rejects_duplicate_name() {
        let state = test_state();
        let owner = make_owner(&state).await;
        let owner_id = owner.id;

        create_project(
            State(state.clone()),
            Extension(CurrentUser(owner.clone())),
            Path(owner_id),
            Json(CreateProjectRequest { name: "proj".into(), description: "d".into() }),
        )
        .await
        .unwrap();

        let err = create_project(
            State(state),
            Extension(CurrentUser(owner)),
            Path(owner_id),
            Json(CreateProjectRequest { name: "proj".into(), description: "d2".into() }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.error_code().as_str(), "E_PROJECT_EXISTS");
    }

    #[tokio::test]
    async fn update_project_sets_pool_id() {
        let state = test_state();
        let owner = make_owner(&state).await;
        let owner_id = owner.id;
        let (_, Json(created)) = create_project(
            State(state.clone()),
            Extension(CurrentUser(owner.clone())),
            Path(owner_id),
            Json(CreateProjectRequest { name: "proj".into(), description: "d".into() }),
        )
        .await
        .unwrap();

        let pool_id = Uuid::new_v4();
        let Json(updated) = update_project(
            State(state),
            Extension(CurrentUser(owner)),
            Path((owner_id, created.id)),
            Json(UpdateProjectRequest { description: None, pool_id: Some(pool_id) }),
        )
        .await
        .unwrap();
        assert_eq!(updated.pool_id, Some(pool_id));
    }

    #[tokio::test]
    async fn restore_without_prior_deletion_is_rejected() {
        let state = test_state();
        let owner = make_owner(&state).await;
        let owner_id = owner.id;
        let (_, Json(created)) = create_project(
            State(state.clone()),
            Extension(CurrentUser(owner.clone())),
            Path(owner_id),
            Json(CreateProjectRequest { name: "proj".into(), description: "d".into() }),
        )
        .await
        .unwrap();

        let err = delete_project(
            State(state),
            Extension(CurrentUser(owner)),
            Path((owner_id, created.id)),
            Query(DeletionAction { action: DeletionActionKind::Restore, no_backup: None, new_name: None }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.error_code().as_str(), "E_PROJECT_NOT_DELETED");
    }
}
