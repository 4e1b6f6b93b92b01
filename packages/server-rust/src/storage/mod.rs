//! Note persistence.
//!
//! Defines the [`NoteStore`] seam the HTTP handlers talk to, the
//! [`StoreError`] taxonomy every backend reports through, and two
//! implementations. Stores never see the request deadline; handlers bound
//! each call with [`RequestContext::run`], which reports expiry as
//! [`DeadlineExceeded`] on its own.
//!
//! [`RequestContext::run`]: crate::service::context::RequestContext::run
//! [`DeadlineExceeded`]: crate::service::context::DeadlineExceeded
//!
//!
//! - [`MemoryNoteStore`]: `DashMap`-backed, for tests and local runs
//! - [`PgNoteStore`]: `PostgreSQL` via `sqlx` (feature `postgres`)

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use notes_core::{CreateNote, Note, UpdateNote};

use crate::config::{DatabaseConfig, StoreKind};

pub use memory::MemoryNoteStore;
#[cfg(feature = "postgres")]
pub use postgres::PgNoteStore;

/// Errors reported by a [`NoteStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A query that must return a row returned none.
    #[error("no rows in result set")]
    NotFound,
    /// A mutating statement matched no rows.
    #[error("no rows affected")]
    NoRowsAffected,
    /// Driver, connection, or schema failure.
    #[error("store backend failure: {0}")]
    Backend(#[source] anyhow::Error),
}

/// Persistence backend for notes.
#[async_trait]
pub trait NoteStore: Send + Sync {
    /// All notes, ordered by id.
    async fn list(&self) -> Result<Vec<Note>, StoreError>;

    /// A single note. [`StoreError::NotFound`] if absent.
    async fn get(&self, id: i64) -> Result<Note, StoreError>;

    /// Inserts a note and returns it with its assigned id and timestamp.
    async fn create(&self, note: &CreateNote) -> Result<Note, StoreError>;

    /// Applies the present fields of `patch` and returns the stored result.
    /// [`StoreError::NotFound`] if absent.
    async fn update(&self, id: i64, patch: &UpdateNote) -> Result<Note, StoreError>;

    /// Deletes a note and returns the number of rows removed (0 or 1).
    async fn delete(&self, id: i64) -> Result<u64, StoreError>;

    /// One-time schema setup.
    async fn initialize(&self) -> Result<(), StoreError>;

    /// Cheap round trip used by readiness checks.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Opens the store selected by configuration.
///
/// # Errors
///
/// Returns an error if the database is unreachable, or if `postgres` was
/// selected in a build without the `postgres` feature.
#[cfg_attr(not(feature = "postgres"), allow(unused_variables, clippy::unused_async))]
pub async fn open(kind: StoreKind, db: &DatabaseConfig) -> anyhow::Result<Arc<dyn NoteStore>> {
    match kind {
        StoreKind::Memory => Ok(Arc::new(MemoryNoteStore::new())),
        #[cfg(feature = "postgres")]
        StoreKind::Postgres => Ok(Arc::new(PgNoteStore::connect(db).await?)),
        #[cfg(not(feature = "postgres"))]
        StoreKind::Postgres => {
            anyhow::bail!("built without the `postgres` feature; use NOTES_STORE=memory")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_memory_store() {
        let store = open(StoreKind::Memory, &DatabaseConfig::default())
            .await
            .unwrap();
        store.initialize().await.unwrap();
        store.ping().await.unwrap();
        assert!(store.list().await.unwrap().is_empty());
    }

    #[test]
    fn store_error_messages() {
        assert_eq!(StoreError::NotFound.to_string(), "no rows in result set");
        assert_eq!(StoreError::NoRowsAffected.to_string(), "no rows affected");
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_cuts_off_a_slow_store_call() {
        use std::time::Duration;

        use crate::service::context::{Deadline, DeadlineExceeded};

        let store = MemoryNoteStore::new();
        let slow = async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            store.list().await
        };
        let result = Deadline::after(Duration::from_millis(10)).run(slow).await;
        assert!(matches!(result, Err(DeadlineExceeded)));
    }
}
