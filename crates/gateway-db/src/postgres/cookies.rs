use async_trait::async_trait;
use gateway_error::{ErrorCode, GatewayError};
use sqlx::PgPool;
use uuid::Uuid;

use crate::model::{Cookie, Paginator};
use crate::traits::{Cookies, Result};

pub struct PgCookies {
    pool: PgPool,
}

impl PgCookies {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

type CookieRow = (Uuid, Uuid, Option<chrono::DateTime<chrono::Utc>>, String);

fn from_row(row: CookieRow) -> Cookie {
    Cookie {
        id: row.0,
        user_id: row.1,
        expires: row.2,
        metadata: row.3,
    }
}

const SELECT: &str = "SELECT id, user_id, expires, metadata FROM cookies";

#[async_trait]
impl Cookies for PgCookies {
    async fn create(
        &self,
        user_id: Uuid,
        metadata: &str,
        ttl: chrono::Duration,
    ) -> Result<Cookie> {
        let row = sqlx::query_as::<_, CookieRow>(&format!(
            "INSERT INTO cookies (id, user_id, expires, metadata) \
             VALUES ($1, $2, now() + $3, $4) RETURNING id, user_id, expires, metadata"
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(ttl)
        .bind(metadata)
        .fetch_one(&self.pool)
        .await
        .map_err(GatewayError::from)?;
        Ok(from_row(row))
    }

    async fn get(&self, cookie_id: Uuid, user_id: Option<Uuid>) -> Result<Cookie> {
        let mut sql = format!("{SELECT} WHERE id = $1");
        if user_id.is_some() {
            sql.push_str(" AND user_id = $2");
        }
        let query = sqlx::query_as::<_, CookieRow>(&sql).bind(cookie_id);
        let row = if let Some(u) = user_id { query.bind(u) } else { query }
            .fetch_optional(&self.pool)
            .await
            .map_err(GatewayError::from)?
            .ok_or_else(|| GatewayError::code(ErrorCode::SessionNotFound))?;
        Ok(from_row(row))
    }

    async fn delete(&self, cookie: &Cookie) -> Result<()> {
        sqlx::query("DELETE FROM cookies WHERE id = $1")
            .bind(cookie.id)
            .execute(&self.pool)
            .await
            .map_err(GatewayError::from)?;
        Ok(())
    }

    async fn list(&self, page: Paginator, user_id: Option<Uuid>) -> Result<Vec<Cookie>> {
        let mut sql = format!("{SELECT}");
        if user_id.is_some() {
            sql.push_str(" WHERE user_id = $3");
        }
        sql.push_str(" ORDER BY id OFFSET $1 LIMIT $2");
        let query = sqlx::query_as::<_, CookieRow>(&sql)
            .bind(page.offset)
            .bind(page.limit);
        let rows = if let Some(u) = user_id { query.bind(u) } else { query }
            .fetch_all(&self.pool)
            .await
            .map_err(GatewayError::from)?;
        Ok(rows.into_iter().map(from_row).collect())
    }
}
