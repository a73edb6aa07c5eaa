//! `/users`, `/users/self`, `/users/lookup`, `/users/count`, `/users/{user_id}`.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use gateway_auth::password;
use gateway_db::model::{Paginator, RemovalState, User};
use gateway_error::{ErrorCode, GatewayError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::session::CurrentUser;
use crate::path::{check_user_access_permissions, require_admin, require_system_admin};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub pg_num: u32,
    #[serde(default = "default_page_size")]
    pub pg_size: u32,
    pub removal_state: Option<RemovalStateQuery>,
}

fn default_page_size() -> u32 {
    100
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum RemovalStateQuery {
    Present,
    TrashBin,
    All,
}

impl From<RemovalStateQuery> for RemovalState {
    fn from(value: RemovalStateQuery) -> Self {
        match value {
            RemovalStateQuery::Present => Self::Present,
            RemovalStateQuery::TrashBin => Self::TrashBin,
            RemovalStateQuery::All => Self::All,
        }
    }
}

pub(crate) fn clamp_page_size(raw: u32) -> Result<u32, GatewayError> {
    if (10..=200).contains(&raw) {
        Ok(raw)
    } else {
        Err(GatewayError::code(ErrorCode::WrongRequest))
    }
}

#[derive(Debug, Serialize)]
pub struct UserView {
    pub id: Uuid,
    pub name: String,
    pub display_name: String,
    pub email: String,
    pub is_confirmed: bool,
    pub is_disabled: bool,
    pub is_admin: bool,
    pub is_system: bool,
    pub erasure_date: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<User> for UserView {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            display_name: u.display_name,
            email: u.email,
            is_confirmed: u.is_confirmed,
            is_disabled: u.is_disabled,
            is_admin: u.is_admin,
            is_system: u.is_system,
            erasure_date: u.erasure_date,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub display_name: String,
    pub password: String,
    pub email: String,
    #[serde(default)]
    pub is_admin: bool,
}

/// `POST /users` — admin-only; only a system-admin may create another admin
/// (the creation privilege matrix).
pub async fn create_user(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(body): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserView>), GatewayError> {
    require_admin(&current.0)?;
    if body.is_admin {
        require_system_admin(&current.0)?;
    }

    if state.db.users().get_by_name(&body.name).await.is_ok() {
        return Err(GatewayError::code(ErrorCode::UserExists));
    }

    let hash = password::hash_password(&body.password)
        .map_err(|e| GatewayError::Internal(format!("hashing password: {e}")))?;

    let user = state
        .db
        .users()
        .create(&body.name, &body.display_name, &hash, true, false, body.is_admin, false, &body.email)
        .await?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// `GET /users` — admin-only listing.
pub async fn list_users(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<UserView>>, GatewayError> {
    require_admin(&current.0)?;
    let page_size = clamp_page_size(page.pg_size)?;
    let removal_state = page.removal_state.map(RemovalState::from);
    let users = state
        .db
        .users()
        .list(Paginator::new(page.pg_num, page_size), removal_state)
        .await?;
    Ok(Json(users.into_iter().map(UserView::from).collect()))
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: i64,
}

/// `GET /users/count` — admin-only.
pub async fn count_users(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(page): Query<PageQuery>,
) -> Result<Json<CountResponse>, GatewayError> {
    require_admin(&current.0)?;
    let removal_state = page.removal_state.map(RemovalState::from);
    let count = state.db.users().count(removal_state).await?;
    Ok(Json(CountResponse { count }))
}

#[derive(Debug, Deserialize)]
pub struct LookupQuery {
    pub name: String,
}

/// `GET /users/lookup?name=` — admin-only.
pub async fn lookup_user(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(lookup): Query<LookupQuery>,
) -> Result<Json<UserView>, GatewayError> {
    require_admin(&current.0)?;
    let user = state
        .db
        .users()
        .get_by_name(&lookup.name)
        .await
        .map_err(|_| GatewayError::code(ErrorCode::UserNotFound))?;
    Ok(Json(user.into()))
}

/// `GET /users/self`.
pub async fn get_self(Extension(current): Extension<CurrentUser>) -> Json<UserView> {
    Json(current.0.into())
}

#[derive(Debug, Deserialize)]
pub struct UpdateSelfRequest {
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// `PATCH /users/self` — self may only touch a limited field set.
pub async fn update_self(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(body): Json<UpdateSelfRequest>,
) -> Result<Json<UserView>, GatewayError> {
    let mut user = current.0;
    if let Some(display_name) = body.display_name {
        user.display_name = display_name;
    }
    if let Some(email) = body.email {
        user.email = email;
    }
    if let Some(raw_password) = body.password {
        user.password_hash = password::hash_password(&raw_password)
            .map_err(|e| GatewayError::Internal(format!("hashing password: {e}")))?;
    }
    state.db.users().update(&user).await?;
    Ok(Json(user.into()))
}

/// `GET /users/{user_id}` — admin or self.
pub async fn get_user(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<UserView>, GatewayError> {
    check_user_access_permissions(&current.0, user_id)?;
    let user = crate::path::load_user(&state, user_id, false).await?;
    Ok(Json(user.into()))
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub is_confirmed: Option<bool>,
    pub is_disabled: Option<bool>,
    pub is_admin: Option<bool>,
}

/// `PATCH /users/{user_id}` — admin may edit any non-admin user; editing
/// another admin requires system-admin.
pub async fn update_user(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(user_id): Path<Uuid>,
    Json(body): Json<UpdateUserRequest>,
) -> Result<Json<UserView>, GatewayError> {
    require_admin(&current.0)?;
    let mut user = crate::path::load_user(&state, user_id, true).await?;
    if user.is_admin && !current.0.is_system {
        return Err(GatewayError::code(ErrorCode::SystemAdminRequired));
    }
    if let Some(target_is_admin) = body.is_admin {
        require_system_admin(&current.0)?;
        user.is_admin = target_is_admin;
    }
    if let Some(display_name) = body.display_name {
        user.display_name = display_name;
    }
    if let Some(email) = body.email {
        user.email = email;
    }
    if let Some(is_confirmed) = body.is_confirmed {
        user.is_confirmed = is_confirmed;
    }
    if let Some(is_disabled) = body.is_disabled {
        user.is_disabled = is_disabled;
    }
    state.db.users().update(&user).await?;
    Ok(Json(user.into()))
}

#[derive(Debug, Deserialize)]
pub struct DeletionAction {
    #[serde(default)]
    pub action: DeletionActionKind,
    pub no_backup: Option<bool>,
    pub new_name: Option<String>,
}

#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub enum DeletionActionKind {
    #[default]
    Delete,
    Restore,
    Erase,
}

/// `DELETE /users/{user_id}?action=Delete|Restore|Erase` — admin or self,
/// though a system-admin can never delete itself.
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(user_id): Path<Uuid>,
    Query(action): Query<DeletionAction>,
) -> Result<StatusCode, GatewayError> {
    check_user_access_permissions(&current.0, user_id)?;
    let mut user = crate::path::load_user(&state, user_id, false).await?;

    if user.is_system {
        return Err(GatewayError::code(ErrorCode::AccessDenied));
    }
    if current.0.is_system && current.0.id == user.id {
        return Err(GatewayError::code(ErrorCode::AccessDenied));
    }

    match action.action {
        DeletionActionKind::Delete => {
            user.erasure_date = Some(chrono::Utc::now() + chrono::Duration::seconds(state.config.trashbin.expiration_seconds));
            user.no_backup = action.no_backup.unwrap_or(user.no_backup);
        }
        DeletionActionKind::Restore => {
            if user.erasure_date.is_none() {
                return Err(GatewayError::code(ErrorCode::UserNotDeleted));
            }
            user.erasure_date = None;
            if let Some(new_name) = action.new_name {
                user.name = new_name;
            }
        }
        DeletionActionKind::Erase => {
            user.erasure_date = Some(chrono::Utc::now());
        }
    }
    state.db.users().update(&user).await?;
    Ok(StatusCode::OK)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_state;

    async fn make_user(state: &AppState, is_admin: bool, is_system: bool) -> User {
        state
            .db
            .users()
            .create("someone", "Someone", "hash", true, false, is_admin, is_system, "someone@example.test")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn create_user_requires_admin() {
        let state = test_state();
        let plain = make_user(&state, false, false).await;

        let err = create_user(
            State(state),
            Extension(CurrentUser(plain)),
            Json(CreateUserRequest {
                name: "new".into(),
                display_name: "New".into(),
                password: "hunter22".into(),
                email: "new@example.test".into(),
                is_admin: false,
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.error_code().as_str(), "E_ADMIN_REQUIRED");
    }

    #[tokio::test]
    async fn only_system_admin_may_create_another_admin() {
        let state = test_state();
        let admin = make_user(&state, true, false).await;

        let err = create_user(
            State(state),
            Extension(CurrentUser(admin)),
            Json(CreateUserRequest {
                name: "new-admin".into(),
                display_name: "New Admin".into(),
                password: "hunter22".into(),
                email: "newadmin@example.test".into(),
                is_admin: true,
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.error_code().as_str(), "E_SYSTEM_ADMIN_REQUIRED");
    }

    #[tokio::test]
    async fn system_admin_creates_user_successfully() {
        let state = test_state();
        let root = make_user(&state, true, true).await;

        let (status, Json(created)) = create_user(
            State(state),
            Extension(CurrentUser(root)),
            Json(CreateUserRequest {
                name: "new".into(),
                display_name: "New".into(),
                password: "hunter22".into(),
                email: "new@example.test".into(),
                is_admin: false,
            }),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created.name, "new");
    }

    #[tokio::test]
    async fn get_self_returns_current_user() {
        let state = test_state();
        let user = make_user(&state, false, false).await;
        let Json(view) = get_self(Extension(CurrentUser(user.clone()))).await;
        assert_eq!(view.id, user.id);
        assert_eq!(view.email, user.email);
    }

    #[tokio::test]
    async fn delete_user_rejects_system_admin_self_deletion() {
        let state = test_state();
        let root = make_user(&state, true, true).await;
        let root_id = root.id;

        let err = delete_user(
            State(state),
            Extension(CurrentUser(root)),
            Path(root_id),
            Query(DeletionAction { action: DeletionActionKind::Delete, no_backup: None, new_name: None }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.error_code().as_str(), "E_ACCESS_DENIED");
    }

    #[tokio::test]
    async fn restore_without_prior_deletion_is_rejected() {
        let state = test_state();
        let admin = make_user(&state, true, false).await;
        let target = make_user(&state, false, false).await;
        let target_id = target.id;

        let err = delete_user(
            State(state),
            Extension(CurrentUser(admin)),
            Path(target_id),
            Query(DeletionAction { action: DeletionActionKind::Restore, no_backup: None, new_name: None }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.error_code().as_str(), "E_USER_NOT_DELETED");
    }
}
