//! In-memory [`NoteStore`] backed by [`DashMap`].
//!
//! Ids come from an atomic counter starting at 1 and are never reused, so a
//! deleted note stays deleted.

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use notes_core::{CreateNote, Note, UpdateNote};

use super::{NoteStore, StoreError};

pub struct MemoryNoteStore {
    notes: DashMap<i64, Note>,
    next_id: AtomicI64,
}

impl MemoryNoteStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            notes: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }

    /// Number of stored notes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.notes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}

impl Default for MemoryNoteStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NoteStore for MemoryNoteStore {
    async fn list(&self) -> Result<Vec<Note>, StoreError> {
        let mut notes: Vec<Note> = self.notes.iter().map(|e| e.value().clone()).collect();
        notes.sort_by_key(|n| n.id);
        Ok(notes)
    }

    async fn get(&self, id: i64) -> Result<Note, StoreError> {
        self.notes
            .get(&id)
            .map(|e| e.value().clone())
            .ok_or(StoreError::NotFound)
    }

    async fn create(&self, note: &CreateNote) -> Result<Note, StoreError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let note = Note {
            id,
            title: note.title.clone(),
            content: note.content.clone(),
            created_at: Utc::now(),
        };
        self.notes.insert(id, note.clone());
        Ok(note)
    }

    async fn update(&self, id: i64, patch: &UpdateNote) -> Result<Note, StoreError> {
        let mut entry = self.notes.get_mut(&id).ok_or(StoreError::NotFound)?;
        if let Some(title) = &patch.title {
            entry.title.clone_from(title);
        }
        if let Some(content) = &patch.content {
            entry.content.clone_from(content);
        }
        Ok(entry.clone())
    }

    async fn delete(&self, id: i64) -> Result<u64, StoreError> {
        Ok(u64::from(self.notes.remove(&id).is_some()))
    }

    async fn initialize(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
