//! `PostgreSQL` [`NoteStore`] using a `sqlx` connection pool.

use async_trait::async_trait;
use notes_core::{CreateNote, Note, UpdateNote};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use tracing::info;

use super::{NoteStore, StoreError};
use crate::config::DatabaseConfig;

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS notes (
    id BIGSERIAL PRIMARY KEY,
    title TEXT NOT NULL,
    content TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
)";

const SELECT_ALL: &str = "SELECT id, title, content, created_at FROM notes ORDER BY id";

const SELECT_ONE: &str = "SELECT id, title, content, created_at FROM notes WHERE id = $1";

const INSERT: &str = "INSERT INTO notes (title, content) VALUES ($1, $2) \
                      RETURNING id, title, content, created_at";

const UPDATE: &str = "UPDATE notes SET title = COALESCE($1, title), content = COALESCE($2, content) \
                      WHERE id = $3 RETURNING id, title, content, created_at";

const DELETE: &str = "DELETE FROM notes WHERE id = $1";

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::NotFound,
            other => Self::Backend(other.into()),
        }
    }
}

pub struct PgNoteStore {
    pool: PgPool,
}

impl PgNoteStore {
    /// Wraps an existing pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a pool against the configured database.
    ///
    /// # Errors
    ///
    /// Returns an error if the first connection cannot be established.
    pub async fn connect(config: &DatabaseConfig) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.connection_url())
            .await?;
        info!(
            host = %config.host,
            port = config.port,
            database = %config.name,
            "connected to PostgreSQL"
        );
        Ok(Self::new(pool))
    }
}

fn note_from_row(row: &PgRow) -> Result<Note, sqlx::Error> {
    Ok(Note {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl NoteStore for PgNoteStore {
    async fn list(&self) -> Result<Vec<Note>, StoreError> {
        let rows = sqlx::query(SELECT_ALL).fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| note_from_row(row).map_err(StoreError::from))
            .collect()
    }

    async fn get(&self, id: i64) -> Result<Note, StoreError> {
        let row = sqlx::query(SELECT_ONE)
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(note_from_row(&row)?)
    }

    async fn create(&self, note: &CreateNote) -> Result<Note, StoreError> {
        let row = sqlx::query(INSERT)
            .bind(&note.title)
            .bind(&note.content)
            .fetch_one(&self.pool)
            .await?;
        Ok(note_from_row(&row)?)
    }

    async fn update(&self, id: i64, patch: &UpdateNote) -> Result<Note, StoreError> {
        let row = sqlx::query(UPDATE)
            .bind(patch.title.as_deref())
            .bind(patch.content.as_deref())
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(note_from_row(&row)?)
    }

    async fn delete(&self, id: i64) -> Result<u64, StoreError> {
        let result = sqlx::query(DELETE).bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn initialize(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_TABLE).execute(&self.pool).await?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
