use async_trait::async_trait;
use gateway_error::{ErrorCode, GatewayError};
use sqlx::PgPool;
use uuid::Uuid;

use crate::model::{
    Integration, IntegrationStatus, IntegrationType, IntegrationTypeId, Paginator,
};
use crate::traits::{IntegrationTypes, Integrations, Result};

pub struct PgIntegrationTypes {
    pool: PgPool,
}

impl PgIntegrationTypes {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IntegrationTypes for PgIntegrationTypes {
    async fn get_by_id(&self, id: IntegrationTypeId) -> Result<IntegrationType> {
        let row = sqlx::query_as::<_, (IntegrationTypeId, String, bool)>(
            "SELECT id, display_name, twoway FROM integration_types WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(GatewayError::from)?
        .ok_or_else(|| GatewayError::code(ErrorCode::IntegrationTypeNotFound))?;
        Ok(IntegrationType {
            id: row.0,
            display_name: row.1,
            twoway: row.2,
        })
    }

    async fn list(&self, page: Option<Paginator>) -> Result<Vec<IntegrationType>> {
        let page = page.unwrap_or(Paginator {
            offset: 0,
            limit: i64::MAX,
        });
        let rows = sqlx::query_as::<_, (IntegrationTypeId, String, bool)>(
            "SELECT id, display_name, twoway FROM integration_types \
             ORDER BY id OFFSET $1 LIMIT $2",
        )
        .bind(page.offset)
        .bind(page.limit)
        .fetch_all(&self.pool)
        .await
        .map_err(GatewayError::from)?;
        Ok(rows
            .into_iter()
            .map(|(id, display_name, twoway)| IntegrationType {
                id,
                display_name,
                twoway,
            })
            .collect())
    }
}

pub struct PgIntegrations {
    pool: PgPool,
}

impl PgIntegrations {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

type IntegrationRow = (
    Uuid,
    String,
    Uuid,
    String,
    IntegrationTypeId,
    IntegrationStatus,
    Option<String>,
    String,
    bool,
    i64,
);

fn from_row(row: IntegrationRow) -> Integration {
    Integration {
        id: row.0,
        name: row.1,
        project_id: row.2,
        config_id: row.3,
        integration_type: row.4,
        status: row.5,
        last_error: row.6,
        update_rev: row.7,
        enabled: row.8,
        num_undelivered: row.9,
    }
}

const SELECT: &str = "SELECT id, name, project_id, config_id, type, status, last_error, \
    update_rev, enabled, num_undelivered FROM integrations";

#[async_trait]
impl Integrations for PgIntegrations {
    async fn get_by_id(&self, id: Uuid, project_id: Option<Uuid>) -> Result<Integration> {
        let mut sql = format!("{SELECT} WHERE id = $1");
        if project_id.is_some() {
            sql.push_str(" AND project_id = $2");
        }
        let query = sqlx::query_as::<_, IntegrationRow>(&sql).bind(id);
        let row = if let Some(p) = project_id { query.bind(p) } else { query }
            .fetch_optional(&self.pool)
            .await
            .map_err(GatewayError::from)?
            .ok_or_else(|| GatewayError::code(ErrorCode::IntegrationNotFound))?;
        Ok(from_row(row))
    }

    async fn get_by_name(&self, name: &str, project_id: Uuid) -> Result<Integration> {
        let row = sqlx::query_as::<_, IntegrationRow>(&format!(
            "{SELECT} WHERE project_id = $1 AND name = $2"
        ))
        .bind(project_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(GatewayError::from)?
        .ok_or_else(|| GatewayError::code(ErrorCode::IntegrationNotFound))?;
        Ok(from_row(row))
    }

    async fn get_by_config_id(&self, config_id: &str) -> Result<Integration> {
        let row = sqlx::query_as::<_, IntegrationRow>(&format!("{SELECT} WHERE config_id = $1"))
            .bind(config_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(GatewayError::from)?
            .ok_or_else(|| GatewayError::code(ErrorCode::IntegrationNotFound))?;
        Ok(from_row(row))
    }

    async fn list(
        &self,
        page: Option<Paginator>,
        project_id: Option<Uuid>,
        types: Option<&[IntegrationTypeId]>,
    ) -> Result<Vec<Integration>> {
        let page = page.unwrap_or(Paginator {
            offset: 0,
            limit: i64::MAX,
        });
        let mut sql = format!("{SELECT}");
        if project_id.is_some() {
            sql.push_str(" WHERE project_id = $3");
        }
        sql.push_str(" ORDER BY name OFFSET $1 LIMIT $2");
        let query = sqlx::query_as::<_, IntegrationRow>(&sql)
            .bind(page.offset)
            .bind(page.limit);
        let rows = if let Some(p) = project_id { query.bind(p) } else { query }
            .fetch_all(&self.pool)
            .await
            .map_err(GatewayError::from)?;

        let mut integrations: Vec<Integration> = rows.into_iter().map(from_row).collect();
        if let Some(types) = types {
            integrations.retain(|i| types.contains(&i.integration_type));
        }
        Ok(integrations)
    }

    async fn count(&self, project_id: Option<Uuid>) -> Result<i64> {
        let rows = self.list(None, project_id, None).await?;
        Ok(rows.len() as i64)
    }

    async fn create(
        &self,
        name: &str,
        project_id: Uuid,
        config_id: &str,
        integration_type: IntegrationTypeId,
        status: IntegrationStatus,
    ) -> Result<Integration> {
        let existing: i64 = sqlx::query_scalar(
            "SELECT count(*) FROM integrations WHERE project_id = $1 AND name = $2",
        )
        .bind(project_id)
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(GatewayError::from)?;
        if existing > 0 {
            return Err(GatewayError::code(ErrorCode::IntegrationExists));
        }

        let row = sqlx::query_as::<_, IntegrationRow>(
            "INSERT INTO integrations (id, name, project_id, config_id, type, status, \
             last_error, update_rev, enabled, num_undelivered) \
             VALUES ($1, $2, $3, $4, $5, $6, NULL, $7, true, 0) \
             RETURNING id, name, project_id, config_id, type, status, last_error, update_rev, \
             enabled, num_undelivered",
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(project_id)
        .bind(config_id)
        .bind(integration_type)
        .bind(status)
        .bind(Uuid::new_v4().to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(GatewayError::from)?;
        Ok(from_row(row))
    }

    async fn update(&self, integration: &Integration) -> Result<()> {
        sqlx::query(
            "UPDATE integrations SET name = $2, status = $3, last_error = $4, \
             update_rev = $5, enabled = $6, num_undelivered = $7 WHERE id = $1",
        )
        .bind(integration.id)
        .bind(&integration.name)
        .bind(integration.status)
        .bind(&integration.last_error)
        .bind(&integration.update_rev)
        .bind(integration.enabled)
        .bind(integration.num_undelivered)
        .execute(&self.pool)
        .await
        .map_err(GatewayError::from)?;
        Ok(())
    }

    async fn delete(&self, integration: &Integration) -> Result<()> {
        sqlx::query("DELETE FROM integrations WHERE id = $1")
            .bind(integration.id)
            .execute(&self.pool)
            .await
            .map_err(GatewayError::from)?;
        Ok(())
    }
}
