//! Path-dependency resolution for the nested
//! `/{user_id}/projects/{project_id}/fuzzers/{fuzzer_id}/revisions/{revision_id}`
//! hierarchy. Each loader hydrates one segment and, for mutating methods,
//! rejects an entity that is in the trash bin or being erased.

use gateway_db::model::{Fuzzer, Project, RemovalState, Revision, User};
use gateway_error::{ErrorCode, GatewayError};
use uuid::Uuid;

use crate::state::AppState;

/// Whether `method` requires a live (non-trashed) entity. Only `GET` and
/// `DELETE` are allowed to touch a trashed/erasing resource.
#[must_use]
pub fn is_mutating(method: &axum::http::Method) -> bool {
    !matches!(*method, axum::http::Method::GET | axum::http::Method::DELETE)
}

fn guard_lockout(
    erasure_date: Option<chrono::DateTime<chrono::Utc>>,
    mutating: bool,
    deleted_code: ErrorCode,
) -> Result<(), GatewayError> {
    if !mutating {
        return Ok(());
    }
    let state = if erasure_date.is_some_and(|d| d > chrono::Utc::now()) {
        Some(RemovalState::TrashBin)
    } else if erasure_date.is_some() {
        Some(RemovalState::Erasing)
    } else {
        None
    };
    if state.is_some() {
        return Err(GatewayError::code(deleted_code));
    }
    Ok(())
}

pub async fn load_user(state: &AppState, user_id: Uuid, mutating: bool) -> Result<User, GatewayError> {
    let user = state
        .db
        .users()
        .get_by_id(user_id)
        .await
        .map_err(|_| GatewayError::code(ErrorCode::UserNotFound))?;
    guard_lockout(user.erasure_date, mutating, ErrorCode::UserDeleted)?;
    Ok(user)
}

pub async fn load_project(
    state: &AppState,
    project_id: Uuid,
    owner_id: Uuid,
    mutating: bool,
) -> Result<Project, GatewayError> {
    let project = state
        .db
        .projects()
        .get_by_id(project_id, Some(owner_id), true)
        .await
        .map_err(|_| GatewayError::code(ErrorCode::ProjectNotFound))?;
    guard_lockout(project.erasure_date, mutating, ErrorCode::ProjectDeleted)?;
    Ok(project)
}

pub async fn load_fuzzer(
    state: &AppState,
    fuzzer_id: Uuid,
    project_id: Uuid,
    mutating: bool,
) -> Result<Fuzzer, GatewayError> {
    let fuzzer = state
        .db
        .fuzzers()
        .get_by_id(fuzzer_id, Some(project_id), true)
        .await
        .map_err(|_| GatewayError::code(ErrorCode::FuzzerNotFound))?;
    guard_lockout(fuzzer.erasure_date, mutating, ErrorCode::FuzzerDeleted)?;
    Ok(fuzzer)
}

pub async fn load_revision(
    state: &AppState,
    revision_id: Uuid,
    fuzzer_id: Uuid,
    mutating: bool,
) -> Result<Revision, GatewayError> {
    let revision = state
        .db
        .revisions()
        .get_by_id(revision_id, Some(fuzzer_id), true)
        .await
        .map_err(|_| GatewayError::code(ErrorCode::RevisionNotFound))?;
    guard_lockout(revision.erasure_date, mutating, ErrorCode::RevisionDeleted)?;
    Ok(revision)
}

/// `check_user_access_permissions`: non-admins may only act on their own
/// `user_id`; admins may act on any user.
pub fn check_user_access_permissions(current: &User, target_user_id: Uuid) -> Result<(), GatewayError> {
    if current.is_admin || current.id == target_user_id {
        Ok(())
    } else {
        Err(GatewayError::code(ErrorCode::AccessDenied))
    }
}

/// `check_client_is_not_admin`: routes scoped under a user's own
/// `/projects`/`/pools` subtree only make sense for client accounts.
pub fn check_client_is_not_admin(target_user: &User) -> Result<(), GatewayError> {
    if target_user.is_admin {
        Err(GatewayError::code(ErrorCode::ClientAccountRequired))
    } else {
        Ok(())
    }
}

pub fn require_admin(current: &User) -> Result<(), GatewayError> {
    if current.is_admin {
        Ok(())
    } else {
        Err(GatewayError::code(ErrorCode::AdminRequired))
    }
}

pub fn require_system_admin(current: &User) -> Result<(), GatewayError> {
    if current.is_system {
        Ok(())
    } else {
        Err(GatewayError::code(ErrorCode::SystemAdminRequired))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn user(is_admin: bool) -> User {
        User {
            id: Uuid::new_v4(),
            name: "u".into(),
            display_name: "u".into(),
            password_hash: String::new(),
            is_confirmed: true,
            is_disabled: false,
            is_admin,
            is_system: false,
            email: "u@example.com".into(),
            erasure_date: None,
            no_backup: false,
        }
    }

    #[test]
    fn non_admin_may_only_touch_self() {
        let u = user(false);
        assert!(check_user_access_permissions(&u, u.id).is_ok());
        assert!(check_user_access_permissions(&u, Uuid::new_v4()).is_err());
    }

    #[test]
    fn admin_may_touch_any_user() {
        let admin = user(true);
        assert!(check_user_access_permissions(&admin, Uuid::new_v4()).is_ok());
    }

    #[test]
    fn mutating_rejects_future_erasure_date() {
        let err = guard_lockout(Some(Utc::now() + Duration::days(1)), true, ErrorCode::UserDeleted)
            .unwrap_err();
        assert_eq!(err.error_code().as_str(), "E_USER_DELETED");
    }

    #[test]
    fn reads_are_allowed_on_trashed_entities() {
        assert!(guard_lockout(Some(Utc::now() + Duration::days(1)), false, ErrorCode::UserDeleted).is_ok());
    }
}
