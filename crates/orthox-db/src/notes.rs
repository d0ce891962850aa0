//! Note repository implementation.

use chrono::Utc;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use orthox_core::{new_v7, CreateNoteRequest, Error, Note, Result};

/// PostgreSQL note repository. Notes are append-only.
#[derive(Clone)]
pub struct PgNoteRepository {
    pool: Pool<Postgres>,
}

impl PgNoteRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Insert a note. The caller is responsible for checking the case exists.
    pub async fn insert(&self, req: CreateNoteRequest) -> Result<Note> {
        let note = Note {
            id: new_v7(),
            case_id: req.case_id,
            content: req.content,
            source_url: req.source_url,
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO notes (id, case_id, content, source_url, created_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(note.id)
        .bind(note.case_id)
        .bind(&note.content)
        .bind(note.source_url.as_deref())
        .bind(note.created_at)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(note)
    }

    /// Notes for a case, oldest first.
    pub async fn list_for_case(&self, case_id: Uuid) -> Result<Vec<Note>> {
        let rows = sqlx::query(
            "SELECT id, case_id, content, source_url, created_at
             FROM notes WHERE case_id = $1
             ORDER BY created_at ASC, id ASC",
        )
        .bind(case_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows
            .into_iter()
            .map(|r| Note {
                id: r.get("id"),
                case_id: r.get("case_id"),
                content: r.get("content"),
                source_url: r.get("source_url"),
                created_at: r.get("created_at"),
            })
            .collect())
    }
}
