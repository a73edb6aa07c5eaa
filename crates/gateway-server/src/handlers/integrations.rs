//! `/users/{user_id}/projects/{project_id}/integrations` — bug-tracker
//! configuration. The row exposed over the API never carries connection
//! secrets; those live in object storage keyed by `config_id` and are only
//! read back when a reconciler needs to hand them to a reporter.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use gateway_db::model::{Integration, IntegrationConfig, IntegrationStatus, IntegrationTypeId, Paginator};
use gateway_error::{ErrorCode, GatewayError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::session::CurrentUser;
use crate::path::{check_user_access_permissions, load_project, load_user};
use crate::state::AppState;

fn new_update_rev() -> String {
    Uuid::new_v4().to_string()
}

#[derive(Debug, Serialize)]
pub struct IntegrationView {
    pub id: Uuid,
    pub name: String,
    pub project_id: Uuid,
    pub config_id: String,
    pub integration_type: IntegrationTypeId,
    pub status: IntegrationStatus,
    pub last_error: Option<String>,
    pub enabled: bool,
    pub num_undelivered: i64,
}

impl From<Integration> for IntegrationView {
    fn from(i: Integration) -> Self {
        Self {
            id: i.id,
            name: i.name,
            project_id: i.project_id,
            config_id: i.config_id,
            integration_type: i.integration_type,
            status: i.status,
            last_error: i.last_error,
            enabled: i.enabled,
            num_undelivered: i.num_undelivered,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateIntegrationRequest {
    pub name: String,
    pub config: IntegrationConfig,
}

fn type_of(config: &IntegrationConfig) -> Result<IntegrationTypeId, GatewayError> {
    match config {
        IntegrationConfig::Jira { .. } => Ok(IntegrationTypeId::Jira),
        IntegrationConfig::Youtrack { .. } => Ok(IntegrationTypeId::Youtrack),
        IntegrationConfig::Other => Err(GatewayError::code(ErrorCode::WrongRequest)),
    }
}

pub async fn create_integration(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path((user_id, project_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<CreateIntegrationRequest>,
) -> Result<(StatusCode, Json<IntegrationView>), GatewayError> {
    check_user_access_permissions(&current.0, user_id)?;
    load_user(&state, user_id, false).await?;
    let project = load_project(&state, project_id, user_id, true).await?;

    let integration_type = type_of(&body.config)?;
    if state.db.integrations().get_by_name(&body.name, project.id).await.is_ok() {
        return Err(GatewayError::code(ErrorCode::IntegrationExists));
    }

    let config_id = Uuid::new_v4();
    let payload = serde_json::to_vec(&body.config)
        .map_err(|e| GatewayError::Internal(format!("integration config encode failed: {e}")))?;
    state
        .storage
        .store_integration_config(config_id, payload.into())
        .await?;

    let integration = state
        .db
        .integrations()
        .create(
            &body.name,
            project.id,
            &config_id.to_string(),
            integration_type,
            IntegrationStatus::InProgress,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(integration.into())))
}

#[derive(Debug, Deserialize)]
pub struct ListIntegrationsQuery {
    #[serde(default)]
    pub pg_num: u32,
    #[serde(default = "default_page_size")]
    pub pg_size: u32,
}

fn default_page_size() -> u32 {
    100
}

pub async fn list_integrations(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path((user_id, project_id)): Path<(Uuid, Uuid)>,
    Query(page): Query<ListIntegrationsQuery>,
) -> Result<Json<Vec<IntegrationView>>, GatewayError> {
    check_user_access_permissions(&current.0, user_id)?;
    load_user(&state, user_id, false).await?;
    let project = load_project(&state, project_id, user_id, false).await?;

    let integrations = state
        .db
        .integrations()
        .list(Some(Paginator::new(page.pg_num, page.pg_size)), Some(project.id), None)
        .await?;
    Ok(Json(integrations.into_iter().map(IntegrationView::from).collect()))
}

async fn load_integration(state: &AppState, project_id: Uuid, integration_id: Uuid) -> Result<Integration, GatewayError> {
    state
        .db
        .integrations()
        .get_by_id(integration_id, Some(project_id))
        .await
        .map_err(|_| GatewayError::code(ErrorCode::IntegrationNotFound))
}

pub async fn get_integration(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path((user_id, project_id, integration_id)): Path<(Uuid, Uuid, Uuid)>,
) -> Result<Json<IntegrationView>, GatewayError> {
    check_user_access_permissions(&current.0, user_id)?;
    load_user(&state, user_id, false).await?;
    let project = load_project(&state, project_id, user_id, false).await?;
    let integration = load_integration(&state, project.id, integration_id).await?;
    Ok(Json(integration.into()))
}

/// Jira's update-response shape is treated as canonical for both reporter
/// kinds; YouTrack's endpoint in upstream spells it slightly differently.
#[derive(Debug, Deserialize)]
pub struct UpdateIntegrationRequest {
    pub name: Option<String>,
    pub config: Option<IntegrationConfig>,
    pub enabled: Option<bool>,
}

pub async fn update_integration(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path((user_id, project_id, integration_id)): Path<(Uuid, Uuid, Uuid)>,
    Json(body): Json<UpdateIntegrationRequest>,
) -> Result<Json<IntegrationView>, GatewayError> {
    check_user_access_permissions(&current.0, user_id)?;
    load_user(&state, user_id, false).await?;
    let project = load_project(&state, project_id, user_id, true).await?;
    let mut integration = load_integration(&state, project.id, integration_id).await?;

    if let Some(name) = body.name {
        integration.name = name;
    }
    if let Some(enabled) = body.enabled {
        integration.enabled = enabled;
    }
    if let Some(config) = body.config {
        if type_of(&config)? != integration.integration_type {
            return Err(GatewayError::code(ErrorCode::IntegrationTypeMismatch));
        }
        let payload = serde_json::to_vec(&config)
            .map_err(|e| GatewayError::Internal(format!("integration config encode failed: {e}")))?;
        let config_id = Uuid::parse_str(&integration.config_id)
            .map_err(|e| GatewayError::Internal(format!("stored config_id is not a uuid: {e}")))?;
        state.storage.store_integration_config(config_id, payload.into()).await?;
        // Re-saved credentials invalidate any in-flight reporter callback.
        integration.update_rev = new_update_rev();
        integration.status = IntegrationStatus::InProgress;
        integration.last_error = None;
    }

    state.db.integrations().update(&integration).await?;
    Ok(Json(integration.into()))
}

pub async fn delete_integration(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path((user_id, project_id, integration_id)): Path<(Uuid, Uuid, Uuid)>,
) -> Result<StatusCode, GatewayError> {
    check_user_access_permissions(&current.0, user_id)?;
    load_user(&state, user_id, false).await?;
    let project = load_project(&state, project_id, user_id, true).await?;
    let integration = load_integration(&state, project.id, integration_id).await?;

    let config_id = Uuid::parse_str(&integration.config_id).ok();
    state.db.integrations().delete(&integration).await?;
    if let Some(config_id) = config_id {
        let _ = state.storage.delete_integration_config(config_id).await;
    }
    Ok(StatusCode::OK)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_state;

    fn jira_config() -> IntegrationConfig {
        IntegrationConfig::Jira {
            url: "https://jira.example.test".into(),
            project: "FUZZ".into(),
            username: "bot".into(),
            password: "secret".into(),
            issue_type: "Bug".into(),
            priority: None,
        }
    }

    async fn seed(state: &AppState) -> (Uuid, Uuid) {
        let owner = state
            .db
            .users()
            .create("owner", "Owner", "hash", true, false, false, false, "owner@example.test")
            .await
            .unwrap();
        let project = state.db.projects().create("proj", "d", owner.id, None).await.unwrap();
        (owner.id, project.id)
    }

    #[tokio::test]
    async fn create_integration_rejects_other_type() {
        let state = test_state();
        let (owner_id, project_id) = seed(&state).await;
        let owner = state.db.users().get_by_id(owner_id).await.unwrap();

        let err = create_integration(
            State(state),
            Extension(CurrentUser(owner)),
            Path((owner_id, project_id)),
            Json(CreateIntegrationRequest { name: "tracker".into(), config: IntegrationConfig::Other }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.error_code().as_str(), "E_WRONG_REQUEST");
    }

    #[tokio::test]
    async fn create_integration_then_get_round_trips() {
        let state = test_state();
        let (owner_id, project_id) = seed(&state).await;
        let owner = state.db.users().get_by_id(owner_id).await.unwrap();

        let (status, Json(created)) = create_integration(
            State(state.clone()),
            Extension(CurrentUser(owner.clone())),
            Path((owner_id, project_id)),
            Json(CreateIntegrationRequest { name: "tracker".into(), config: jira_config() }),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created.integration_type, IntegrationTypeId::Jira);

        let Json(fetched) = get_integration(
            State(state),
            Extension(CurrentUser(owner)),
            Path((owner_id, project_id, created.id)),
        )
        .await
        .unwrap();
        assert_eq!(fetched.name, "tracker");
    }

    #[tokio::test]
    async fn create_integration_rejects_duplicate_name() {
        let state = test_state();
        let (owner_id, project_id) = seed(&state).await;
        let owner = state.db.users().get_by_id(owner_id).await.unwrap();

        create_integration(
            State(state.clone()),
            Extension(CurrentUser(owner.clone())),
            Path((owner_id, project_id)),
            Json(CreateIntegrationRequest { name: "tracker".into(), config: jira_config() }),
        )
        .await
        .unwrap();

        let err = create_integration(
            State(state),
            Extension(CurrentUser(owner)),
            Path((owner_id, project_id)),
            Json(CreateIntegrationRequest { name: "tracker".into(), config: jira_config() }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.error_code().as_str(), "E_INTEGRATION_EXISTS");
    }

    #[tokio::test]
    async fn update_integration_rejects_type_change() {
        let state = test_state();
        let (owner_id, project_id) = seed(&state).await;
        let owner = state.db.users().get_by_id(owner_id).await.unwrap();

        let (_, Json(created)) = create_integration(
            State(state.clone()),
            Extension(CurrentUser(owner.clone())),
            Path((owner_id, project_id)),
            Json(CreateIntegrationRequest { name: "tracker".into(), config: jira_config() }),
        )
        .await
        .unwrap();

        let err = update_integration(
            State(state),
            Extension(CurrentUser(owner)),
            Path((owner_id, project_id, created.id)),
            Json(UpdateIntegrationRequest {
                name: None,
                config: Some(IntegrationConfig::Youtrack {
                    url: "https://yt.example.test".into(),
                    token: "tok".into(),
                    project: "FUZZ".into(),
                }),
                enabled: None,
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.error_code().as_str(), "E_INTEGRATION_TYPE_MISMATCH");
    }
}
