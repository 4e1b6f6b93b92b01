//! CRUD handlers for the `/notes` resource.
//!
//! Handlers never build error responses themselves: every failure is
//! returned as an [`ApiError`] and rendered by the classifier.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use notes_core::{CreateNote, Note, UpdateNote};
use tracing::{debug, info};

use super::AppState;
use crate::network::extract::{JsonBody, NoteId};
use crate::service::context::RequestContext;
use crate::service::error::ApiError;
use crate::storage::StoreError;

/// `GET /notes`
pub async fn list_notes(
    State(state): State<AppState>,
    ctx: RequestContext,
) -> Result<Json<Vec<Note>>, ApiError> {
    let notes = ctx.run(state.store.list()).await?;
    debug!(request_id = %ctx.request_id(), count = notes.len(), "listed notes");
    Ok(Json(notes))
}

/// `GET /notes/{id}`
pub async fn get_note(
    State(state): State<AppState>,
    ctx: RequestContext,
    NoteId(id): NoteId,
) -> Result<Json<Note>, ApiError> {
    let note = ctx.run(state.store.get(id)).await?;
    Ok(Json(note))
}

/// `POST /notes` -- 201 with the stored note.
pub async fn create_note(
    State(state): State<AppState>,
    ctx: RequestContext,
    JsonBody(body): JsonBody<CreateNote>,
) -> Result<(StatusCode, Json<Note>), ApiError> {
    ctx.validate(&body)?;
    let note = ctx.run(state.store.create(&body)).await?;
    info!(request_id = %ctx.request_id(), note_id = note.id, "note created");
    Ok((StatusCode::CREATED, Json(note)))
}

/// `PATCH /notes/{id}` -- absent fields keep their stored value.
pub async fn update_note(
    State(state): State<AppState>,
    ctx: RequestContext,
    NoteId(id): NoteId,
    JsonBody(patch): JsonBody<UpdateNote>,
) -> Result<Json<Note>, ApiError> {
    ctx.validate(&patch)?;
    let note = ctx.run(state.store.update(id, &patch)).await?;
    info!(request_id = %ctx.request_id(), note_id = note.id, "note updated");
    Ok(Json(note))
}

/// `DELETE /notes/{id}` -- 204, or 404 when nothing was deleted.
pub async fn delete_note(
    State(state): State<AppState>,
    ctx: RequestContext,
    NoteId(id): NoteId,
) -> Result<StatusCode, ApiError> {
    let affected = ctx.run(state.store.delete(id)).await?;
    if affected == 0 {
        return Err(ctx.reject(StoreError::NoRowsAffected));
    }
    info!(request_id = %ctx.request_id(), note_id = id, "note deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::network::NetworkConfig;
    use crate::service::classify::{classify, ErrorKind};
    use crate::service::context::{Deadline, RequestId};
    use crate::storage::MemoryNoteStore;

    fn test_state() -> AppState {
        AppState::new(Arc::new(MemoryNoteStore::new()), NetworkConfig::default())
    }

    fn ctx() -> RequestContext {
        RequestContext::new(RequestId::generate(), Deadline::after(Duration::from_secs(5)))
    }

    fn body(title: &str, content: &str) -> JsonBody<CreateNote> {
        JsonBody(CreateNote {
            title: title.to_string(),
            content: content.to_string(),
        })
    }

    fn kind(err: &ApiError) -> ErrorKind {
        classify(err.error()).kind
    }

    #[tokio::test]
    async fn create_then_get_and_list() {
        let state = test_state();
        let (status, Json(created)) = create_note(State(state.clone()), ctx(), body("a", "b"))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert!(created.id > 0);

        let Json(fetched) = get_note(State(state.clone()), ctx(), NoteId(created.id))
            .await
            .unwrap();
        assert_eq!(fetched, created);

        let Json(all) = list_notes(State(state), ctx()).await.unwrap();
        assert_eq!(all, vec![created]);
    }

    #[tokio::test]
    async fn create_rejects_invalid_body_before_touching_store() {
        let state = test_state();
        let err = create_note(State(state.clone()), ctx(), body("a", ""))
            .await
            .unwrap_err();
        assert_eq!(kind(&err), ErrorKind::Validation);

        let Json(all) = list_notes(State(state), ctx()).await.unwrap();
        assert!(all.is_empty());
    }

    #[tokio::test]
    async fn update_missing_note_is_not_found() {
        let patch = JsonBody(UpdateNote {
            title: Some("t".into()),
            content: None,
        });
        let err = update_note(State(test_state()), ctx(), NoteId(99), patch)
            .await
            .unwrap_err();
        assert_eq!(kind(&err), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn delete_twice_is_204_then_not_found() {
        let state = test_state();
        let (_, Json(note)) = create_note(State(state.clone()), ctx(), body("a", "b"))
            .await
            .unwrap();

        let status = delete_note(State(state.clone()), ctx(), NoteId(note.id))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);

        let err = delete_note(State(state.clone()), ctx(), NoteId(note.id))
            .await
            .unwrap_err();
        assert_eq!(kind(&err), ErrorKind::NotFound);

        let err = get_note(State(state), ctx(), NoteId(note.id))
            .await
            .unwrap_err();
        assert_eq!(kind(&err), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn errors_carry_the_request_id() {
        let ctx = ctx();
        let expected = ctx.request_id().clone();
        let err = get_note(State(test_state()), ctx, NoteId(1))
            .await
            .unwrap_err();
        assert_eq!(err.request_id(), &expected);
    }
}
