use async_trait::async_trait;
use gateway_error::{ErrorCode, GatewayError};
use sqlx::PgPool;
use uuid::Uuid;

use crate::model::{EngineId, Image, ImageStatus, ImageType, Paginator};
use crate::traits::{Images, Result};

pub struct PgImages {
    pool: PgPool,
}

impl PgImages {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

type ImageRow = (Uuid, String, String, Vec<EngineId>, ImageStatus, Option<Uuid>);

fn from_row(row: ImageRow) -> Image {
    Image {
        id: row.0,
        name: row.1,
        description: row.2,
        engines: row.3,
        status: row.4,
        project_id: row.5,
    }
}

const SELECT: &str =
    "SELECT id, name, description, engines, status, project_id FROM images";

#[async_trait]
impl Images for PgImages {
    async fn get_by_id(&self, id: Uuid, project_id: Option<Uuid>) -> Result<Image> {
        let mut sql = format!("{SELECT} WHERE id = $1");
        if project_id.is_some() {
            sql.push_str(" AND (project_id = $2 OR project_id IS NULL)");
        }
        let query = sqlx::query_as::<_, ImageRow>(&sql).bind(id);
        let row = if let Some(p) = project_id { query.bind(p) } else { query }
            .fetch_optional(&self.pool)
            .await
            .map_err(GatewayError::from)?
            .ok_or_else(|| GatewayError::code(ErrorCode::ImageNotFound))?;
        Ok(from_row(row))
    }

    async fn get_by_name(&self, name: &str, project_id: Option<Uuid>) -> Result<Image> {
        let mut sql = format!("{SELECT} WHERE name = $1");
        if project_id.is_some() {
            sql.push_str(" AND (project_id = $2 OR project_id IS NULL)");
        } else {
            sql.push_str(" AND project_id IS NULL");
        }
        let query = sqlx::query_as::<_, ImageRow>(&sql).bind(name);
        let row = if let Some(p) = project_id { query.bind(p) } else { query }
            .fetch_optional(&self.pool)
            .await
            .map_err(GatewayError::from)?
            .ok_or_else(|| GatewayError::code(ErrorCode::ImageNotFound))?;
        Ok(from_row(row))
    }

    async fn list(
        &self,
        page: Paginator,
        project_id: Option<Uuid>,
        image_type: Option<ImageType>,
        statuses: Option<&[ImageStatus]>,
        engines: Option<&[EngineId]>,
    ) -> Result<Vec<Image>> {
        let sql = format!("{SELECT} ORDER BY name OFFSET $1 LIMIT $2");
        let rows = sqlx::query_as::<_, ImageRow>(&sql)
            .bind(page.offset)
            .bind(page.limit)
            .fetch_all(&self.pool)
            .await
            .map_err(GatewayError::from)?;

        let mut images: Vec<Image> = rows.into_iter().map(from_row).collect();
        if let Some(project_id) = project_id {
            images.retain(|i| i.project_id == Some(project_id) || i.project_id.is_none());
        }
        if let Some(image_type) = image_type {
            images.retain(|i| match image_type {
                ImageType::Builtin => i.project_id.is_none(),
                ImageType::Custom => i.project_id.is_some(),
            });
        }
        if let Some(statuses) = statuses {
            images.retain(|i| statuses.contains(&i.status));
        }
        if let Some(engines) = engines {
            images.retain(|i| i.engines.iter().any(|e| engines.contains(e)));
        }
        Ok(images)
    }

    async fn count(
        &self,
        project_id: Option<Uuid>,
        image_type: Option<ImageType>,
        statuses: Option<&[ImageStatus]>,
        engines: Option<&[EngineId]>,
    ) -> Result<i64> {
        let all = self
            .list(
                Paginator {
                    offset: 0,
                    limit: i64::MAX,
                },
                project_id,
                image_type,
                statuses,
                engines,
            )
            .await?;
        Ok(all.len() as i64)
    }

    async fn create(
        &self,
        name: &str,
        description: &str,
        project_id: Option<Uuid>,
        engines: &[EngineId],
        status: ImageStatus,
    ) -> Result<Image> {
        let row = sqlx::query_as::<_, ImageRow>(
            "INSERT INTO images (id, name, description, engines, status, project_id) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING id, name, description, engines, status, project_id",
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(description)
        .bind(engines)
        .bind(status)
        .bind(project_id)
        .fetch_one(&self.pool)
        .await
        .map_err(GatewayError::from)?;
        Ok(from_row(row))
    }

    async fn update(&self, image: &Image) -> Result<()> {
        sqlx::query(
            "UPDATE images SET name = $2, description = $3, status = $4 WHERE id = $1",
        )
        .bind(image.id)
        .bind(&image.name)
        .bind(&image.description)
        .bind(image.status)
        .execute(&self.pool)
        .await
        .map_err(GatewayError::from)?;
        Ok(())
    }

    async fn delete(&self, image: &Image) -> Result<()> {
        sqlx::query("DELETE FROM images WHERE id = $1")
            .bind(image.id)
            .execute(&self.pool)
            .await
            .map_err(GatewayError::from)?;
        Ok(())
    }

    async fn set_engines(&self, image: &Image, engine_ids: &[EngineId]) -> Result<()> {
        sqlx::query("UPDATE images SET engines = $2 WHERE id = $1")
            .bind(image.id)
            .bind(engine_ids)
            .execute(&self.pool)
            .await
            .map_err(GatewayError::from)?;
        Ok(())
    }
}
