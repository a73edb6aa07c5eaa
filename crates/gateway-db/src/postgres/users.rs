use async_trait::async_trait;
use gateway_error::{ErrorCode, GatewayError};
use sqlx::PgPool;
use uuid::Uuid;

use crate::model::{Paginator, RemovalState, User};
use crate::traits::{Result, Users};

pub struct PgUsers {
    pool: PgPool,
}

impl PgUsers {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

type UserRow = (
    Uuid,
    String,
    String,
    String,
    bool,
    bool,
    bool,
    bool,
    String,
    Option<chrono::DateTime<chrono::Utc>>,
    bool,
);

fn from_row(row: UserRow) -> User {
    User {
        id: row.0,
        name: row.1,
        display_name: row.2,
        password_hash: row.3,
        is_confirmed: row.4,
        is_disabled: row.5,
        is_admin: row.6,
        is_system: row.7,
        email: row.8,
        erasure_date: row.9,
        no_backup: row.10,
    }
}

const SELECT: &str = "SELECT id, name, display_name, password_hash, is_confirmed, \
    is_disabled, is_admin, is_system, email, erasure_date, no_backup FROM users";

use super::removal_clause;

#[async_trait]
impl Users for PgUsers {
    async fn create(
        &self,
        name: &str,
        display_name: &str,
        password_hash: &str,
        is_confirmed: bool,
        is_disabled: bool,
        is_admin: bool,
        is_system: bool,
        email: &str,
    ) -> Result<User> {
        let existing = sqlx::query_scalar::<_, i64>("SELECT count(*) FROM users WHERE name = $1")
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .map_err(GatewayError::from)?;
        if existing > 0 {
            return Err(GatewayError::code(ErrorCode::UserExists));
        }

        let row = sqlx::query_as::<_, UserRow>(
            "INSERT INTO users (id, name, display_name, password_hash, is_confirmed, \
             is_disabled, is_admin, is_system, email, erasure_date, no_backup) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NULL, false) \
             RETURNING id, name, display_name, password_hash, is_confirmed, is_disabled, \
             is_admin, is_system, email, erasure_date, no_backup",
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(display_name)
        .bind(password_hash)
        .bind(is_confirmed)
        .bind(is_disabled)
        .bind(is_admin)
        .bind(is_system)
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(GatewayError::from)?;

        Ok(from_row(row))
    }

    async fn delete(&self, user: &User) -> Result<()> {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user.id)
            .execute(&self.pool)
            .await
            .map_err(GatewayError::from)?;
        Ok(())
    }

    async fn get_by_id(&self, user_id: Uuid) -> Result<User> {
        let row = sqlx::query_as::<_, UserRow>(&format!("{SELECT} WHERE id = $1"))
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(GatewayError::from)?
            .ok_or_else(|| GatewayError::code(ErrorCode::UserNotFound))?;
        Ok(from_row(row))
    }

    async fn get_by_name(&self, name: &str) -> Result<User> {
        let row = sqlx::query_as::<_, UserRow>(&format!("{SELECT} WHERE name = $1"))
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(GatewayError::from)?
            .ok_or_else(|| GatewayError::code(ErrorCode::UserNotFound))?;
        Ok(from_row(row))
    }

    async fn list(
        &self,
        page: Paginator,
        removal_state: Option<RemovalState>,
    ) -> Result<Vec<User>> {
        let clause = removal_state.and_then(removal_clause);
        let sql = match &clause {
            Some(c) => format!("{SELECT} WHERE {c} ORDER BY name OFFSET $1 LIMIT $2"),
            None => format!("{SELECT} ORDER BY name OFFSET $1 LIMIT $2"),
        };
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .bind(page.offset)
            .bind(page.limit)
            .fetch_all(&self.pool)
            .await
            .map_err(GatewayError::from)?;
        Ok(rows.into_iter().map(from_row).collect())
    }

    async fn count(&self, removal_state: Option<RemovalState>) -> Result<i64> {
        let clause = removal_state.and_then(removal_clause);
        let sql = match &clause {
            Some(c) => format!("SELECT count(*) FROM users WHERE {c}"),
            None => "SELECT count(*) FROM users".to_string(),
        };
        sqlx::query_scalar(&sql)
            .fetch_one(&self.pool)
            .await
            .map_err(GatewayError::from)
    }

    async fn update(&self, user: &User) -> Result<()> {
        sqlx::query(
            "UPDATE users SET name = $2, display_name = $3, password_hash = $4, \
             is_confirmed = $5, is_disabled = $6, is_admin = $7, is_system = $8, \
             email = $9, erasure_date = $10, no_backup = $11 WHERE id = $1",
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.display_name)
        .bind(&user.password_hash)
        .bind(user.is_confirmed)
        .bind(user.is_disabled)
        .bind(user.is_admin)
        .bind(user.is_system)
        .bind(&user.email)
        .bind(user.erasure_date)
        .bind(user.no_backup)
        .execute(&self.pool)
        .await
        .map_err(GatewayError::from)?;
        Ok(())
    }
}
