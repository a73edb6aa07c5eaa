use async_trait::async_trait;
use gateway_error::{ErrorCode, GatewayError};
use sqlx::PgPool;

use crate::model::{Engine, EngineId, Lang, LangId, Paginator};
use crate::traits::{Engines, Langs, Result};

pub struct PgLangs {
    pool: PgPool,
}

impl PgLangs {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Langs for PgLangs {
    async fn get_by_id(&self, id: LangId) -> Result<Lang> {
        let row = sqlx::query_as::<_, (LangId, String)>(
            "SELECT id, display_name FROM langs WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(GatewayError::from)?
        .ok_or_else(|| GatewayError::code(ErrorCode::LangNotFound))?;
        Ok(Lang {
            id: row.0,
            display_name: row.1,
        })
    }

    async fn list(&self, page: Option<Paginator>) -> Result<Vec<Lang>> {
        let page = page.unwrap_or(Paginator {
            offset: 0,
            limit: i64::MAX,
        });
        let rows = sqlx::query_as::<_, (LangId, String)>(
            "SELECT id, display_name FROM langs ORDER BY id OFFSET $1 LIMIT $2",
        )
        .bind(page.offset)
        .bind(page.limit)
        .fetch_all(&self.pool)
        .await
        .map_err(GatewayError::from)?;
        Ok(rows
            .into_iter()
            .map(|(id, display_name)| Lang { id, display_name })
            .collect())
    }

    async fn count(&self) -> Result<i64> {
        sqlx::query_scalar("SELECT count(*) FROM langs")
            .fetch_one(&self.pool)
            .await
            .map_err(GatewayError::from)
    }

    async fn create(&self, id: LangId, display_name: &str) -> Result<Lang> {
        let existing: i64 = sqlx::query_scalar("SELECT count(*) FROM langs WHERE id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(GatewayError::from)?;
        if existing > 0 {
            return Err(GatewayError::code(ErrorCode::LangExists));
        }
        sqlx::query("INSERT INTO langs (id, display_name) VALUES ($1, $2)")
            .bind(id)
            .bind(display_name)
            .execute(&self.pool)
            .await
            .map_err(GatewayError::from)?;
        Ok(Lang {
            id,
            display_name: display_name.to_string(),
        })
    }

    async fn update(&self, lang: &Lang) -> Result<()> {
        sqlx::query("UPDATE langs SET display_name = $2 WHERE id = $1")
            .bind(lang.id)
            .bind(&lang.display_name)
            .execute(&self.pool)
            .await
            .map_err(GatewayError::from)?;
        Ok(())
    }

    async fn delete(&self, lang: &Lang) -> Result<()> {
        let in_use: i64 =
            sqlx::query_scalar("SELECT count(*) FROM fuzzers WHERE lang = $1")
                .bind(lang.id)
                .fetch_one(&self.pool)
                .await
                .map_err(GatewayError::from)?;
        if in_use > 0 {
            return Err(GatewayError::code(ErrorCode::LangInUseBy));
        }
        sqlx::query("DELETE FROM langs WHERE id = $1")
            .bind(lang.id)
            .execute(&self.pool)
            .await
            .map_err(GatewayError::from)?;
        Ok(())
    }
}

pub struct PgEngines {
    pool: PgPool,
}

impl PgEngines {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn langs_for(&self, id: EngineId) -> Result<Vec<LangId>> {
        sqlx::query_scalar::<_, LangId>("SELECT lang_id FROM engine_langs WHERE engine_id = $1")
            .bind(id)
            .fetch_all(&self.pool)
            .await
            .map_err(GatewayError::from)
    }
}

#[async_trait]
impl Engines for PgEngines {
    async fn get_by_id(&self, id: EngineId) -> Result<Engine> {
        let display_name: Option<String> =
            sqlx::query_scalar("SELECT display_name FROM engines WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(GatewayError::from)?;
        let display_name =
            display_name.ok_or_else(|| GatewayError::code(ErrorCode::EngineNotFound))?;
        let langs = self.langs_for(id).await?;
        Ok(Engine {
            id,
            display_name,
            langs,
        })
    }

    async fn list(&self, page: Option<Paginator>, lang_id: Option<LangId>) -> Result<Vec<Engine>> {
        let page = page.unwrap_or(Paginator {
            offset: 0,
            limit: i64::MAX,
        });
        let sql = if lang_id.is_some() {
            "SELECT DISTINCT e.id, e.display_name FROM engines e \
             JOIN engine_langs el ON el.engine_id = e.id WHERE el.lang_id = $3 \
             ORDER BY e.id OFFSET $1 LIMIT $2"
        } else {
            "SELECT id, display_name FROM engines ORDER BY id OFFSET $1 LIMIT $2"
        };
        let query = sqlx::query_as::<_, (EngineId, String)>(sql)
            .bind(page.offset)
            .bind(page.limit);
        let rows = if let Some(l) = lang_id { query.bind(l) } else { query }
            .fetch_all(&self.pool)
            .await
            .map_err(GatewayError::from)?;

        let mut engines = Vec::with_capacity(rows.len());
        for (id, display_name) in rows {
            let langs = self.langs_for(id).await?;
            engines.push(Engine {
                id,
                display_name,
                langs,
            });
        }
        Ok(engines)
    }

    async fn count(&self, lang_id: Option<LangId>) -> Result<i64> {
        let sql = if lang_id.is_some() {
            "SELECT count(DISTINCT e.id) FROM engines e \
             JOIN engine_langs el ON el.engine_id = e.id WHERE el.lang_id = $1"
        } else {
            "SELECT count(*) FROM engines"
        };
        let query = sqlx::query_scalar(sql);
        if let Some(l) = lang_id { query.bind(l) } else { query }
            .fetch_one(&self.pool)
            .await
            .map_err(GatewayError::from)
    }

    async fn create(
        &self,
        id: EngineId,
        display_name: &str,
        lang_ids: &[LangId],
    ) -> Result<Engine> {
        let existing: i64 = sqlx::query_scalar("SELECT count(*) FROM engines WHERE id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(GatewayError::from)?;
        if existing > 0 {
            return Err(GatewayError::code(ErrorCode::EngineExists));
        }
        sqlx::query("INSERT INTO engines (id, display_name) VALUES ($1, $2)")
            .bind(id)
            .bind(display_name)
            .execute(&self.pool)
            .await
            .map_err(GatewayError::from)?;
        for lang in lang_ids {
            sqlx::query(
                "INSERT INTO engine_langs (engine_id, lang_id) VALUES ($1, $2) \
                 ON CONFLICT DO NOTHING",
            )
            .bind(id)
            .bind(lang)
            .execute(&self.pool)
            .await
            .map_err(GatewayError::from)?;
        }
        Ok(Engine {
            id,
            display_name: display_name.to_string(),
            langs: lang_ids.to_vec(),
        })
    }

    async fn update(&self, engine: &Engine) -> Result<()> {
        sqlx::query("UPDATE engines SET display_name = $2 WHERE id = $1")
            .bind(engine.id)
            .bind(&engine.display_name)
            .execute(&self.pool)
            .await
            .map_err(GatewayError::from)?;
        Ok(())
    }

    async fn delete(&self, engine: &Engine) -> Result<()> {
        let in_use: i64 =
            sqlx::query_scalar("SELECT count(*) FROM fuzzers WHERE engine = $1")
                .bind(engine.id)
                .fetch_one(&self.pool)
                .await
                .map_err(GatewayError::from)?;
        if in_use > 0 {
            return Err(GatewayError::code(ErrorCode::EngineInUseBy));
        }
        sqlx::query("DELETE FROM engine_langs WHERE engine_id = $1")
            .bind(engine.id)
            .execute(&self.pool)
            .await
            .map_err(GatewayError::from)?;
        sqlx::query("DELETE FROM engines WHERE id = $1")
            .bind(engine.id)
            .execute(&self.pool)
            .await
            .map_err(GatewayError::from)?;
        Ok(())
    }

    async fn set_langs(&self, engine: &Engine, lang_ids: &[LangId]) -> Result<()> {
        sqlx::query("DELETE FROM engine_langs WHERE engine_id = $1")
            .bind(engine.id)
            .execute(&self.pool)
            .await
            .map_err(GatewayError::from)?;
        for lang in lang_ids {
            sqlx::query("INSERT INTO engine_langs (engine_id, lang_id) VALUES ($1, $2)")
                .bind(engine.id)
                .bind(lang)
                .execute(&self.pool)
                .await
                .map_err(GatewayError::from)?;
        }
        Ok(())
    }
}
