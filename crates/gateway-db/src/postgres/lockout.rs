use async_trait::async_trait;
use gateway_error::GatewayError;
use sqlx::PgPool;

use crate::model::DeviceCookie;
use crate::traits::{Result, UserLockout};

pub struct PgUserLockout {
    pool: PgPool,
}

impl PgUserLockout {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserLockout for PgUserLockout {
    async fn add(
        &self,
        cookie: &DeviceCookie,
        exp: chrono::DateTime<chrono::Utc>,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO user_lockouts (username, nonce, exp_date) VALUES ($1, $2, $3) \
             ON CONFLICT (username, nonce) DO UPDATE SET exp_date = EXCLUDED.exp_date",
        )
        .bind(&cookie.username)
        .bind(&cookie.nonce)
        .bind(exp)
        .execute(&self.pool)
        .await
        .map_err(GatewayError::from)?;
        Ok(())
    }

    async fn has(&self, cookie: &DeviceCookie) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT count(*) FROM user_lockouts WHERE username = $1 AND nonce = $2 \
             AND exp_date > now()",
        )
        .bind(&cookie.username)
        .bind(&cookie.nonce)
        .fetch_one(&self.pool)
        .await
        .map_err(GatewayError::from)?;
        Ok(count > 0)
    }

    async fn remove_expired(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM user_lockouts WHERE exp_date <= now()")
            .execute(&self.pool)
            .await
            .map_err(GatewayError::from)?;
        Ok(result.rows_affected())
    }
}
