use async_trait::async_trait;
use gateway_error::{ErrorCode, GatewayError};
use sqlx::PgPool;
use uuid::Uuid;

use super::removal_clause;
use crate::model::{Paginator, Project, RemovalState};
use crate::traits::{Projects, Result};

pub struct PgProjects {
    pool: PgPool,
}

impl PgProjects {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

type ProjectRow = (
    Uuid,
    String,
    String,
    Uuid,
    chrono::DateTime<chrono::Utc>,
    Option<Uuid>,
    Option<chrono::DateTime<chrono::Utc>>,
    bool,
);

fn from_row(row: ProjectRow) -> Project {
    Project {
        id: row.0,
        name: row.1,
        description: row.2,
        owner_id: row.3,
        created: row.4,
        pool_id: row.5,
        erasure_date: row.6,
        no_backup: row.7,
    }
}

const SELECT: &str = "SELECT id, name, description, owner_id, created, pool_id, \
    erasure_date, no_backup FROM projects";

#[async_trait]
impl Projects for PgProjects {
    async fn create(
        &self,
        name: &str,
        description: &str,
        owner_id: Uuid,
        pool_id: Option<Uuid>,
    ) -> Result<Project> {
        let existing = sqlx::query_scalar::<_, i64>(
            "SELECT count(*) FROM projects WHERE owner_id = $1 AND name = $2",
        )
        .bind(owner_id)
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(GatewayError::from)?;
        if existing > 0 {
            return Err(GatewayError::code(ErrorCode::ProjectExists));
        }

        let row = sqlx::query_as::<_, ProjectRow>(
            "INSERT INTO projects (id, name, description, owner_id, created, pool_id, \
             erasure_date, no_backup) VALUES ($1, $2, $3, $4, now(), $5, NULL, false) \
             RETURNING id, name, description, owner_id, created, pool_id, erasure_date, no_backup",
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(description)
        .bind(owner_id)
        .bind(pool_id)
        .fetch_one(&self.pool)
        .await
        .map_err(GatewayError::from)?;

        Ok(from_row(row))
    }

    async fn delete(&self, project: &Project) -> Result<()> {
        sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(project.id)
            .execute(&self.pool)
            .await
            .map_err(GatewayError::from)?;
        Ok(())
    }

    async fn get_by_id(
        &self,
        project_id: Uuid,
        owner_id: Option<Uuid>,
        include_erasing: bool,
    ) -> Result<Project> {
        let mut sql = format!("{SELECT} WHERE id = $1");
        if owner_id.is_some() {
            sql.push_str(" AND owner_id = $2");
        }
        if !include_erasing {
            sql.push_str(" AND (erasure_date IS NULL OR erasure_date > now())");
        }

        let query = sqlx::query_as::<_, ProjectRow>(&sql).bind(project_id);
        let row = if let Some(owner) = owner_id {
            query.bind(owner)
        } else {
            query
        }
        .fetch_optional(&self.pool)
        .await
        .map_err(GatewayError::from)?
        .ok_or_else(|| GatewayError::code(ErrorCode::ProjectNotFound))?;

        Ok(from_row(row))
    }

    async fn get_by_name(&self, name: &str, owner_id: Uuid) -> Result<Project> {
        let row = sqlx::query_as::<_, ProjectRow>(&format!(
            "{SELECT} WHERE owner_id = $1 AND name = $2"
        ))
        .bind(owner_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(GatewayError::from)?
        .ok_or_else(|| GatewayError::code(ErrorCode::ProjectNotFound))?;
        Ok(from_row(row))
    }

    async fn list(
        &self,
        page: Paginator,
        owner_id: Option<Uuid>,
        removal_state: Option<RemovalState>,
    ) -> Result<Vec<Project>> {
        let mut clauses = Vec::new();
        if owner_id.is_some() {
            clauses.push("owner_id = $3".to_string());
        }
        if let Some(c) = removal_state.and_then(removal_clause) {
            clauses.push(c.to_string());
        }
        let mut sql = format!("{SELECT}");
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY created OFFSET $1 LIMIT $2");

        let query = sqlx::query_as::<_, ProjectRow>(&sql)
            .bind(page.offset)
            .bind(page.limit);
        let rows = if let Some(owner) = owner_id {
            query.bind(owner)
        } else {
            query
        }
        .fetch_all(&self.pool)
        .await
        .map_err(GatewayError::from)?;

        Ok(rows.into_iter().map(from_row).collect())
    }

    async fn count(
        &self,
        owner_id: Option<Uuid>,
        removal_state: Option<RemovalState>,
    ) -> Result<i64> {
        let mut clauses = Vec::new();
        if owner_id.is_some() {
            clauses.push("owner_id = $1".to_string());
        }
        if let Some(c) = removal_state.and_then(removal_clause) {
            clauses.push(c.to_string());
        }
        let mut sql = "SELECT count(*) FROM projects".to_string();
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }

        let query = sqlx::query_scalar(&sql);
        if let Some(owner) = owner_id {
            query.bind(owner)
        } else {
            query
        }
        .fetch_one(&self.pool)
        .await
        .map_err(GatewayError::from)
    }

    async fn update(&self, project: &Project) -> Result<()> {
        sqlx::query(
            "UPDATE projects SET name = $2, description = $3, pool_id = $4, \
             erasure_date = $5, no_backup = $6 WHERE id = $1",
        )
        .bind(project.id)
        .bind(&project.name)
        .bind(&project.description)
        .bind(project.pool_id)
        .bind(project.erasure_date)
        .bind(project.no_backup)
        .execute(&self.pool)
        .await
        .map_err(GatewayError::from)?;
        Ok(())
    }

    async fn trashbin_empty(&self, owner_id: Uuid) -> Result<u64> {
        // Cascades to fuzzers and revisions explicitly, rather than relying
        // on a database-level ON DELETE CASCADE.
        let mut tx = self.pool.begin().await.map_err(GatewayError::from)?;

        let project_ids: Vec<Uuid> = sqlx::query_scalar(
            "SELECT id FROM projects WHERE owner_id = $1 AND erasure_date IS NOT NULL \
             AND erasure_date <= now()",
        )
        .bind(owner_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(GatewayError::from)?;

        if project_ids.is_empty() {
            return Ok(0);
        }

        sqlx::query(
            "DELETE FROM revisions WHERE fuzzer_id IN \
             (SELECT id FROM fuzzers WHERE project_id = ANY($1))",
        )
        .bind(&project_ids)
        .execute(&mut *tx)
        .await
        .map_err(GatewayError::from)?;

        sqlx::query("DELETE FROM fuzzers WHERE project_id = ANY($1)")
            .bind(&project_ids)
            .execute(&mut *tx)
            .await
            .map_err(GatewayError::from)?;

        let result = sqlx::query("DELETE FROM projects WHERE id = ANY($1)")
            .bind(&project_ids)
            .execute(&mut *tx)
            .await
            .map_err(GatewayError::from)?;

        tx.commit().await.map_err(GatewayError::from)?;
        Ok(result.rows_affected())
    }
}
