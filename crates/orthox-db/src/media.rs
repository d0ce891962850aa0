//! Media repository implementation.

use chrono::Utc;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use orthox_core::{new_v7, CreateMediaRequest, Error, Media, MediaKind, Result};

/// PostgreSQL media repository.
#[derive(Clone)]
pub struct PgMediaRepository {
    pool: Pool<Postgres>,
}

impl PgMediaRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Insert a media reference. The caller checks the case exists.
    pub async fn insert(&self, req: CreateMediaRequest) -> Result<Media> {
        let media = Media {
            id: new_v7(),
            case_id: req.case_id,
            media_type: req.media_type,
            url: req.url,
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO media (id, case_id, media_type, url, created_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(media.id)
        .bind(media.case_id)
        .bind(media.media_type.as_str())
        .bind(&media.url)
        .bind(media.created_at)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(media)
    }

    /// Media for a case, oldest first.
    pub async fn list_for_case(&self, case_id: Uuid) -> Result<Vec<Media>> {
        let rows = sqlx::query(
            "SELECT id, case_id, media_type, url, created_at
             FROM media WHERE case_id = $1
             ORDER BY created_at ASC, id ASC",
        )
        .bind(case_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.into_iter()
            .map(|r| -> Result<Media> {
                let kind: String = r.get("media_type");
                Ok(Media {
                    id: r.get("id"),
                    case_id: r.get("case_id"),
                    media_type: kind.parse::<MediaKind>()?,
                    url: r.get("url"),
                    created_at: r.get("created_at"),
                })
            })
            .collect()
    }
}
