use async_trait::async_trait;
use gateway_error::GatewayError;
use serde_json::Value;
use sqlx::PgPool;

use crate::traits::{Result, UnsentMessages};

pub struct PgUnsentMessages {
    pool: PgPool,
}

impl PgUnsentMessages {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UnsentMessages for PgUnsentMessages {
    async fn save(&self, queue: &str, payloads: &[Value]) -> Result<()> {
        if payloads.is_empty() {
            return Ok(());
        }
        for payload in payloads {
            sqlx::query("INSERT INTO unsent_messages (queue, body) VALUES ($1, $2)")
                .bind(queue)
                .bind(payload)
                .execute(&self.pool)
                .await
                .map_err(GatewayError::from)?;
        }
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<(String, Vec<Value>)>> {
        let rows: Vec<(String, Value)> =
            sqlx::query_as("SELECT queue, body FROM unsent_messages ORDER BY id")
                .fetch_all(&self.pool)
                .await
                .map_err(GatewayError::from)?;

        let mut grouped: Vec<(String, Vec<Value>)> = Vec::new();
        for (queue, body) in rows {
            match grouped.iter_mut().find(|(q, _)| *q == queue) {
                Some((_, bodies)) => bodies.push(body),
                None => grouped.push((queue, vec![body])),
            }
        }

        sqlx::query("DELETE FROM unsent_messages")
            .execute(&self.pool)
            .await
            .map_err(GatewayError::from)?;

        Ok(grouped)
    }
}
