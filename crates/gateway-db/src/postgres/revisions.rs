use async_trait::async_trait;
use gateway_error::{ErrorCode, GatewayError};
use sqlx::PgPool;
use uuid::Uuid;

use super::removal_clause;
use crate::model::{Health, Paginator, RemovalState, Revision, RevisionStatus, UploadStatus};
use crate::traits::{Result, Revisions};

pub struct PgRevisions {
    pool: PgPool,
}

impl PgRevisions {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct RevisionRow {
    pub(crate) id: Uuid,
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) binaries: serde_json::Value,
    pub(crate) seeds: serde_json::Value,
    pub(crate) config: serde_json::Value,
    pub(crate) status: RevisionStatus,
    pub(crate) health: Health,
    pub(crate) feedback: Option<serde_json::Value>,
    pub(crate) fuzzer_id: Uuid,
    pub(crate) image_id: Uuid,
    pub(crate) is_verified: bool,
    pub(crate) created: chrono::DateTime<chrono::Utc>,
    pub(crate) last_start_date: Option<chrono::DateTime<chrono::Utc>>,
    pub(crate) last_stop_date: Option<chrono::DateTime<chrono::Utc>>,
    pub(crate) cpu_usage: i32,
    pub(crate) ram_usage: i32,
    pub(crate) tmpfs_size: i32,
    pub(crate) erasure_date: Option<chrono::DateTime<chrono::Utc>>,
    pub(crate) no_backup: bool,
}

pub(crate) fn row_to_revision(row: RevisionRow) -> Revision {
    Revision {
        id: row.id,
        name: row.name,
        description: row.description,
        binaries: serde_json::from_value(row.binaries).unwrap_or_default(),
        seeds: serde_json::from_value(row.seeds).unwrap_or_default(),
        config: serde_json::from_value(row.config).unwrap_or_default(),
        status: row.status,
        health: row.health,
        feedback: row.feedback.and_then(|v| serde_json::from_value(v).ok()),
        fuzzer_id: row.fuzzer_id,
        image_id: row.image_id,
        is_verified: row.is_verified,
        created: row.created,
        last_start_date: row.last_start_date,
        last_stop_date: row.last_stop_date,
        cpu_usage: row.cpu_usage,
        ram_usage: row.ram_usage,
        tmpfs_size: row.tmpfs_size,
        erasure_date: row.erasure_date,
        no_backup: row.no_backup,
    }
}

pub(crate) const REVISION_SELECT: &str = "SELECT id, name, description, binaries, seeds, \
    config, status, health, feedback, fuzzer_id, image_id, is_verified, created, \
    last_start_date, last_stop_date, cpu_usage, ram_usage, tmpfs_size, erasure_date, \
    no_backup FROM revisions";

fn default_upload_status() -> serde_json::Value {
    serde_json::to_value(UploadStatus::default()).expect("UploadStatus always serializes")
}

#[async_trait]
impl Revisions for PgRevisions {
    async fn create(
        &self,
        name: &str,
        description: &str,
        fuzzer_id: Uuid,
        image_id: Uuid,
        cpu_usage: i32,
        ram_usage: i32,
        tmpfs_size: i32,
    ) -> Result<Revision> {
        let existing = sqlx::query_scalar::<_, i64>(
            "SELECT count(*) FROM revisions WHERE fuzzer_id = $1 AND name = $2",
        )
        .bind(fuzzer_id)
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(GatewayError::from)?;
        if existing > 0 {
            return Err(GatewayError::code(ErrorCode::RevisionExists));
        }

        let empty_upload = default_upload_status();
        let row = sqlx::query_as::<_, RevisionRow>(&format!(
            "INSERT INTO revisions (id, name, description, binaries, seeds, config, status, \
             health, feedback, fuzzer_id, image_id, is_verified, created, last_start_date, \
             last_stop_date, cpu_usage, ram_usage, tmpfs_size, erasure_date, no_backup) \
             VALUES ($1, $2, $3, $4, $4, $4, 'Unverified', 'Ok', NULL, $5, $6, false, now(), \
             NULL, NULL, $7, $8, $9, NULL, false) \
             RETURNING id, name, description, binaries, seeds, config, status, health, \
             feedback, fuzzer_id, image_id, is_verified, created, last_start_date, \
             last_stop_date, cpu_usage, ram_usage, tmpfs_size, erasure_date, no_backup"
        ))
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(description)
        .bind(empty_upload)
        .bind(fuzzer_id)
        .bind(image_id)
        .bind(cpu_usage)
        .bind(ram_usage)
        .bind(tmpfs_size)
        .fetch_one(&self.pool)
        .await
        .map_err(GatewayError::from)?;

        Ok(row_to_revision(row))
    }

    async fn delete(&self, revision: &Revision) -> Result<()> {
        sqlx::query("DELETE FROM revisions WHERE id = $1")
            .bind(revision.id)
            .execute(&self.pool)
            .await
            .map_err(GatewayError::from)?;
        Ok(())
    }

    async fn get_by_id(
        &self,
        revision_id: Uuid,
        fuzzer_id: Option<Uuid>,
        include_erasing: bool,
    ) -> Result<Revision> {
        let mut sql = format!("{REVISION_SELECT} WHERE id = $1");
        if fuzzer_id.is_some() {
            sql.push_str(" AND fuzzer_id = $2");
        }
        if !include_erasing {
            sql.push_str(" AND (erasure_date IS NULL OR erasure_date > now())");
        }

        let query = sqlx::query_as::<_, RevisionRow>(&sql).bind(revision_id);
        let row = if let Some(f) = fuzzer_id { query.bind(f) } else { query }
            .fetch_optional(&self.pool)
            .await
            .map_err(GatewayError::from)?
            .ok_or_else(|| GatewayError::code(ErrorCode::RevisionNotFound))?;

        Ok(row_to_revision(row))
    }

    async fn get_by_name(&self, name: &str, fuzzer_id: Uuid) -> Result<Revision> {
        let row = sqlx::query_as::<_, RevisionRow>(&format!(
            "{REVISION_SELECT} WHERE fuzzer_id = $1 AND name = $2"
        ))
        .bind(fuzzer_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(GatewayError::from)?
        .ok_or_else(|| GatewayError::code(ErrorCode::RevisionNotFound))?;
        Ok(row_to_revision(row))
    }

    async fn list(
        &self,
        page: Paginator,
        fuzzer_id: Option<Uuid>,
        removal_state: Option<RemovalState>,
        statuses: Option<&[RevisionStatus]>,
        health: Option<&[Health]>,
    ) -> Result<Vec<Revision>> {
        let mut clauses = Vec::new();
        if fuzzer_id.is_some() {
            clauses.push("fuzzer_id = $3".to_string());
        }
        if let Some(c) = removal_state.and_then(removal_clause) {
            clauses.push(c.to_string());
        }
        let _ = (statuses, health); // filtered in-process below; kept as params for callers
        let mut sql = format!("{REVISION_SELECT}");
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY created OFFSET $1 LIMIT $2");

        let query = sqlx::query_as::<_, RevisionRow>(&sql)
            .bind(page.offset)
            .bind(page.limit);
        let rows = if let Some(f) = fuzzer_id { query.bind(f) } else { query }
            .fetch_all(&self.pool)
            .await
            .map_err(GatewayError::from)?;

        let mut revisions: Vec<Revision> = rows.into_iter().map(row_to_revision).collect();
        if let Some(statuses) = statuses {
            revisions.retain(|r| statuses.contains(&r.status));
        }
        if let Some(health) = health {
            revisions.retain(|r| health.contains(&r.health));
        }
        Ok(revisions)
    }

    async fn count(
        &self,
        fuzzer_id: Option<Uuid>,
        removal_state: Option<RemovalState>,
        statuses: Option<&[RevisionStatus]>,
        health: Option<&[Health]>,
    ) -> Result<i64> {
        if statuses.is_some() || health.is_some() {
            let page = Paginator {
                offset: 0,
                limit: i64::MAX,
            };
            let rows = self
                .list(page, fuzzer_id, removal_state, statuses, health)
                .await?;
            return Ok(rows.len() as i64);
        }

        let mut clauses = Vec::new();
        if fuzzer_id.is_some() {
            clauses.push("fuzzer_id = $1".to_string());
        }
        if let Some(c) = removal_state.and_then(removal_clause) {
            clauses.push(c.to_string());
        }
        let mut sql = "SELECT count(*) FROM revisions".to_string();
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }

        let query = sqlx::query_scalar(&sql);
        if let Some(f) = fuzzer_id { query.bind(f) } else { query }
            .fetch_one(&self.pool)
            .await
            .map_err(GatewayError::from)
    }

    async fn update(&self, revision: &Revision) -> Result<()> {
        sqlx::query(
            "UPDATE revisions SET name = $2, description = $3, binaries = $4, seeds = $5, \
             config = $6, status = $7, health = $8, feedback = $9, image_id = $10, \
             is_verified = $11, last_start_date = $12, last_stop_date = $13, cpu_usage = $14, \
             ram_usage = $15, tmpfs_size = $16, erasure_date = $17, no_backup = $18 \
             WHERE id = $1",
        )
        .bind(revision.id)
        .bind(&revision.name)
        .bind(&revision.description)
        .bind(serde_json::to_value(&revision.binaries).map_err(|e| GatewayError::Internal(e.to_string()))?)
        .bind(serde_json::to_value(&revision.seeds).map_err(|e| GatewayError::Internal(e.to_string()))?)
        .bind(serde_json::to_value(&revision.config).map_err(|e| GatewayError::Internal(e.to_string()))?)
        .bind(revision.status)
        .bind(revision.health)
        .bind(
            revision
                .feedback
                .as_ref()
                .map(serde_json::to_value)
                .transpose()
                .map_err(|e| GatewayError::Internal(e.to_string()))?,
        )
        .bind(revision.image_id)
        .bind(revision.is_verified)
        .bind(revision.last_start_date)
        .bind(revision.last_stop_date)
        .bind(revision.cpu_usage)
        .bind(revision.ram_usage)
        .bind(revision.tmpfs_size)
        .bind(revision.erasure_date)
        .bind(revision.no_backup)
        .execute(&self.pool)
        .await
        .map_err(GatewayError::from)?;
        Ok(())
    }

    async fn stop_all(&self, project_id: Uuid) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE revisions SET status = 'Stopped', last_stop_date = now() \
             WHERE status IN ('Running', 'Verifying') AND fuzzer_id IN \
             (SELECT id FROM fuzzers WHERE project_id = $1)",
        )
        .bind(project_id)
        .execute(&self.pool)
        .await
        .map_err(GatewayError::from)?;
        Ok(result.rows_affected())
    }
}
