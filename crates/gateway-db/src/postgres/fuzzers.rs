use async_trait::async_trait;
use gateway_error::{ErrorCode, GatewayError};
use sqlx::PgPool;
use uuid::Uuid;

use super::removal_clause;
use super::revisions::{row_to_revision, RevisionRow, REVISION_SELECT};
use crate::model::{EngineId, Fuzzer, LangId, Paginator, RemovalState};
use crate::traits::{Fuzzers, Result};

pub struct PgFuzzers {
    pool: PgPool,
}

impl PgFuzzers {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_active_revision(
        &self,
        active_revision_id: Option<Uuid>,
    ) -> Result<Option<crate::model::Revision>> {
        let Some(id) = active_revision_id else {
            return Ok(None);
        };
        let row = sqlx::query_as::<_, RevisionRow>(&format!("{REVISION_SELECT} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(GatewayError::from)?;
        Ok(row.map(row_to_revision))
    }
}

type FuzzerRow = (
    Uuid,
    String,
    String,
    Uuid,
    EngineId,
    LangId,
    bool,
    chrono::DateTime<chrono::Utc>,
    Option<Uuid>,
    Option<chrono::DateTime<chrono::Utc>>,
    bool,
);

const SELECT: &str = "SELECT id, name, description, project_id, engine, lang, \
    ci_integration, created, active_revision_id, erasure_date, no_backup FROM fuzzers";

impl PgFuzzers {
    async fn from_row(&self, row: FuzzerRow) -> Result<Fuzzer> {
        let active_revision = self.load_active_revision(row.8).await?;
        Ok(Fuzzer {
            id: row.0,
            name: row.1,
            description: row.2,
            project_id: row.3,
            engine: row.4,
            lang: row.5,
            ci_integration: row.6,
            created: row.7,
            active_revision,
            erasure_date: row.9,
            no_backup: row.10,
        })
    }
}

#[async_trait]
impl Fuzzers for PgFuzzers {
    async fn create(
        &self,
        name: &str,
        description: &str,
        project_id: Uuid,
        engine: EngineId,
        lang: LangId,
        ci_integration: bool,
    ) -> Result<Fuzzer> {
        let existing = sqlx::query_scalar::<_, i64>(
            "SELECT count(*) FROM fuzzers WHERE project_id = $1 AND name = $2",
        )
        .bind(project_id)
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(GatewayError::from)?;
        if existing > 0 {
            return Err(GatewayError::code(ErrorCode::FuzzerExists));
        }

        let row = sqlx::query_as::<_, FuzzerRow>(&format!(
            "INSERT INTO fuzzers (id, name, description, project_id, engine, lang, \
             ci_integration, created, active_revision_id, erasure_date, no_backup) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, now(), NULL, NULL, false) \
             RETURNING id, name, description, project_id, engine, lang, ci_integration, \
             created, active_revision_id, erasure_date, no_backup"
        ))
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(description)
        .bind(project_id)
        .bind(engine)
        .bind(lang)
        .bind(ci_integration)
        .fetch_one(&self.pool)
        .await
        .map_err(GatewayError::from)?;

        self.from_row(row).await
    }

    async fn delete(&self, fuzzer: &Fuzzer) -> Result<()> {
        sqlx::query("DELETE FROM fuzzers WHERE id = $1")
            .bind(fuzzer.id)
            .execute(&self.pool)
            .await
            .map_err(GatewayError::from)?;
        Ok(())
    }

    async fn get_by_id(
        &self,
        fuzzer_id: Uuid,
        project_id: Option<Uuid>,
        include_erasing: bool,
    ) -> Result<Fuzzer> {
        let mut sql = format!("{SELECT} WHERE id = $1");
        if project_id.is_some() {
            sql.push_str(" AND project_id = $2");
        }
        if !include_erasing {
            sql.push_str(" AND (erasure_date IS NULL OR erasure_date > now())");
        }

        let query = sqlx::query_as::<_, FuzzerRow>(&sql).bind(fuzzer_id);
        let row = if let Some(p) = project_id { query.bind(p) } else { query }
            .fetch_optional(&self.pool)
            .await
            .map_err(GatewayError::from)?
            .ok_or_else(|| GatewayError::code(ErrorCode::FuzzerNotFound))?;

        self.from_row(row).await
    }

    async fn get_by_name(&self, name: &str, project_id: Uuid) -> Result<Fuzzer> {
        let row = sqlx::query_as::<_, FuzzerRow>(&format!(
            "{SELECT} WHERE project_id = $1 AND name = $2"
        ))
        .bind(project_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(GatewayError::from)?
        .ok_or_else(|| GatewayError::code(ErrorCode::FuzzerNotFound))?;
        self.from_row(row).await
    }

    async fn list(
        &self,
        page: Option<Paginator>,
        project_id: Option<Uuid>,
        removal_state: Option<RemovalState>,
    ) -> Result<Vec<Fuzzer>> {
        let page = page.unwrap_or(Paginator {
            offset: 0,
            limit: i64::MAX,
        });
        let mut clauses = Vec::new();
        if project_id.is_some() {
            clauses.push("project_id = $3".to_string());
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

        let query = sqlx::query_as::<_, FuzzerRow>(&sql)
            .bind(page.offset)
            .bind(page.limit);
        let rows = if let Some(p) = project_id { query.bind(p) } else { query }
            .fetch_all(&self.pool)
            .await
            .map_err(GatewayError::from)?;

        let mut fuzzers = Vec::with_capacity(rows.len());
        for row in rows {
            fuzzers.push(self.from_row(row).await?);
        }
        Ok(fuzzers)
    }

    async fn count(
        &self,
        project_id: Option<Uuid>,
        removal_state: Option<RemovalState>,
    ) -> Result<i64> {
        let mut clauses = Vec::new();
        if project_id.is_some() {
            clauses.push("project_id = $1".to_string());
        }
        if let Some(c) = removal_state.and_then(removal_clause) {
            clauses.push(c.to_string());
        }
        let mut sql = "SELECT count(*) FROM fuzzers".to_string();
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }

        let query = sqlx::query_scalar(&sql);
        if let Some(p) = project_id { query.bind(p) } else { query }
            .fetch_one(&self.pool)
            .await
            .map_err(GatewayError::from)
    }

    async fn update(&self, fuzzer: &Fuzzer) -> Result<()> {
        sqlx::query(
            "UPDATE fuzzers SET name = $2, description = $3, engine = $4, lang = $5, \
             ci_integration = $6, erasure_date = $7, no_backup = $8 WHERE id = $1",
        )
        .bind(fuzzer.id)
        .bind(&fuzzer.name)
        .bind(&fuzzer.description)
        .bind(fuzzer.engine)
        .bind(fuzzer.lang)
        .bind(fuzzer.ci_integration)
        .bind(fuzzer.erasure_date)
        .bind(fuzzer.no_backup)
        .execute(&self.pool)
        .await
        .map_err(GatewayError::from)?;
        Ok(())
    }

    async fn trashbin_list(&self, page: Paginator, project_id: Uuid) -> Result<Vec<Fuzzer>> {
        self.list(Some(page), Some(project_id), Some(RemovalState::TrashBin))
            .await
    }

    async fn trashbin_count(&self, project_id: Uuid) -> Result<i64> {
        self.count(Some(project_id), Some(RemovalState::TrashBin))
            .await
    }

    async fn trashbin_empty(&self, project_id: Uuid, fuzzer_id: Option<Uuid>) -> Result<u64> {
        let mut tx = self.pool.begin().await.map_err(GatewayError::from)?;

        let sql = if fuzzer_id.is_some() {
            "SELECT id FROM fuzzers WHERE project_id = $1 AND id = $2 \
             AND erasure_date IS NOT NULL AND erasure_date <= now()"
        } else {
            "SELECT id FROM fuzzers WHERE project_id = $1 \
             AND erasure_date IS NOT NULL AND erasure_date <= now()"
        };
        let query = sqlx::query_scalar::<_, Uuid>(sql).bind(project_id);
        let ids: Vec<Uuid> = if let Some(f) = fuzzer_id { query.bind(f) } else { query }
            .fetch_all(&mut *tx)
            .await
            .map_err(GatewayError::from)?;

        if ids.is_empty() {
            return Ok(0);
        }

        sqlx::query("DELETE FROM revisions WHERE fuzzer_id = ANY($1)")
            .bind(&ids)
            .execute(&mut *tx)
            .await
            .map_err(GatewayError::from)?;

        let result = sqlx::query("DELETE FROM fuzzers WHERE id = ANY($1)")
            .bind(&ids)
            .execute(&mut *tx)
            .await
            .map_err(GatewayError::from)?;

        tx.commit().await.map_err(GatewayError::from)?;
        Ok(result.rows_affected())
    }

    async fn set_active_revision(
        &self,
        fuzzer: &Fuzzer,
        revision: Option<&crate::model::Revision>,
        start: bool,
        restart: bool,
    ) -> Result<()> {
        // Single transaction: update fuzzer pointer and the revision's own
        // lifecycle timestamps together, so readers never see one without
        // the other.
        let mut tx = self.pool.begin().await.map_err(GatewayError::from)?;

        sqlx::query("UPDATE fuzzers SET active_revision_id = $2 WHERE id = $1")
            .bind(fuzzer.id)
            .bind(revision.map(|r| r.id))
            .execute(&mut *tx)
            .await
            .map_err(GatewayError::from)?;

        if let Some(revision) = revision {
            if start || restart {
                sqlx::query(
                    "UPDATE revisions SET status = 'Verifying', last_start_date = now() \
                     WHERE id = $1",
                )
                .bind(revision.id)
                .execute(&mut *tx)
                .await
                .map_err(GatewayError::from)?;
            }
        }

        tx.commit().await.map_err(GatewayError::from)?;
        Ok(())
    }
}
