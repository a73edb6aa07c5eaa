use async_trait::async_trait;
use gateway_error::{ErrorCode, GatewayError};
use sqlx::PgPool;
use uuid::Uuid;

use crate::model::{Crash, Paginator};
use crate::traits::{Crashes, Result};

pub struct PgCrashes {
    pool: PgPool,
}

impl PgCrashes {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

type CrashRow = (
    Uuid,
    chrono::DateTime<chrono::Utc>,
    Uuid,
    Uuid,
    String,
    Option<String>,
    String,
    String,
    String,
    String,
    bool,
    bool,
    i64,
);

fn from_row(row: CrashRow) -> Crash {
    Crash {
        id: row.0,
        created: row.1,
        fuzzer_id: row.2,
        revision_id: row.3,
        preview: row.4,
        input_id: row.5,
        input_hash: row.6,
        crash_type: row.7,
        brief: row.8,
        output: row.9,
        reproduced: row.10,
        archived: row.11,
        duplicate_count: row.12,
    }
}

const SELECT: &str = "SELECT id, created, fuzzer_id, revision_id, preview, input_id, \
    input_hash, type, brief, output, reproduced, archived, duplicate_count FROM crashes";

#[async_trait]
impl Crashes for PgCrashes {
    #[allow(clippy::too_many_arguments)]
    async fn create(
        &self,
        fuzzer_id: Uuid,
        revision_id: Uuid,
        preview: &str,
        input_id: Option<&str>,
        input_hash: &str,
        crash_type: &str,
        brief: &str,
        output: &str,
        reproduced: bool,
    ) -> Result<Crash> {
        let row = sqlx::query_as::<_, CrashRow>(
            "INSERT INTO crashes (id, created, fuzzer_id, revision_id, preview, input_id, \
             input_hash, type, brief, output, reproduced, archived, duplicate_count) \
             VALUES ($1, now(), $2, $3, $4, $5, $6, $7, $8, $9, $10, false, 0) \
             RETURNING id, created, fuzzer_id, revision_id, preview, input_id, input_hash, \
             type, brief, output, reproduced, archived, duplicate_count",
        )
        .bind(Uuid::new_v4())
        .bind(fuzzer_id)
        .bind(revision_id)
        .bind(preview)
        .bind(input_id)
        .bind(input_hash)
        .bind(crash_type)
        .bind(brief)
        .bind(output)
        .bind(reproduced)
        .fetch_one(&self.pool)
        .await
        .map_err(GatewayError::from)?;
        Ok(from_row(row))
    }

    async fn get(
        &self,
        crash_id: Uuid,
        fuzzer_id: Option<Uuid>,
        revision_id: Option<Uuid>,
    ) -> Result<Crash> {
        let mut sql = format!("{SELECT} WHERE id = $1");
        if fuzzer_id.is_some() {
            sql.push_str(" AND fuzzer_id = $2");
        }
        if revision_id.is_some() {
            sql.push_str(" AND revision_id = $3");
        }
        let mut query = sqlx::query_as::<_, CrashRow>(&sql).bind(crash_id);
        if let Some(f) = fuzzer_id {
            query = query.bind(f);
        }
        if let Some(r) = revision_id {
            query = query.bind(r);
        }
        let row = query
            .fetch_optional(&self.pool)
            .await
            .map_err(GatewayError::from)?
            .ok_or_else(|| GatewayError::code(ErrorCode::CrashNotFound))?;
        Ok(from_row(row))
    }

    async fn update_archived(
        &self,
        crash_id: Uuid,
        fuzzer_id: Uuid,
        archived: bool,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE crashes SET archived = $3 WHERE id = $1 AND fuzzer_id = $2",
        )
        .bind(crash_id)
        .bind(fuzzer_id)
        .bind(archived)
        .execute(&self.pool)
        .await
        .map_err(GatewayError::from)?;
        Ok(result.rows_affected() > 0)
    }

    async fn inc_duplicate_count(
        &self,
        fuzzer_id: Uuid,
        revision_id: Uuid,
        input_hash: &str,
    ) -> Result<Crash> {
        let row = sqlx::query_as::<_, CrashRow>(&format!(
            "UPDATE crashes SET duplicate_count = duplicate_count + 1 \
             WHERE fuzzer_id = $1 AND revision_id = $2 AND input_hash = $3 \
             RETURNING id, created, fuzzer_id, revision_id, preview, input_id, input_hash, \
             type, brief, output, reproduced, archived, duplicate_count"
        ))
        .bind(fuzzer_id)
        .bind(revision_id)
        .bind(input_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(GatewayError::from)?
        .ok_or_else(|| GatewayError::code(ErrorCode::CrashNotFound))?;
        Ok(from_row(row))
    }

    #[allow(clippy::too_many_arguments)]
    async fn list(
        &self,
        page: Paginator,
        fuzzer_id: Option<Uuid>,
        revision_id: Option<Uuid>,
        date_begin: Option<chrono::DateTime<chrono::Utc>>,
        date_end: Option<chrono::DateTime<chrono::Utc>>,
        archived: Option<bool>,
    ) -> Result<Vec<Crash>> {
        let sql = format!("{SELECT} ORDER BY created DESC OFFSET $1 LIMIT $2");
        let rows = sqlx::query_as::<_, CrashRow>(&sql)
            .bind(page.offset)
            .bind(page.limit)
            .fetch_all(&self.pool)
            .await
            .map_err(GatewayError::from)?;

        let mut crashes: Vec<Crash> = rows.into_iter().map(from_row).collect();
        if let Some(f) = fuzzer_id {
            crashes.retain(|c| c.fuzzer_id == f);
        }
        if let Some(r) = revision_id {
            crashes.retain(|c| c.revision_id == r);
        }
        if let Some(begin) = date_begin {
            crashes.retain(|c| c.created >= begin);
        }
        if let Some(end) = date_end {
            crashes.retain(|c| c.created <= end);
        }
        if let Some(archived) = archived {
            crashes.retain(|c| c.archived == archived);
        }
        Ok(crashes)
    }

    async fn count(
        &self,
        fuzzer_id: Option<Uuid>,
        revision_id: Option<Uuid>,
        date_begin: Option<chrono::DateTime<chrono::Utc>>,
        date_end: Option<chrono::DateTime<chrono::Utc>>,
        archived: Option<bool>,
    ) -> Result<i64> {
        let rows = self
            .list(
                Paginator {
                    offset: 0,
                    limit: i64::MAX,
                },
                fuzzer_id,
                revision_id,
                date_begin,
                date_end,
                archived,
            )
            .await?;
        Ok(rows.len() as i64)
    }
}
