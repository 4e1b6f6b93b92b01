//! Request extractors whose failures flow through the error classifier.
//!
//! axum's stock `Json` and `Path` extractors answer bad input with their own
//! plain-text rejections. These wrappers reject with [`ApiError`] instead, so
//! every failure gets the same `{"error": ...}` body and log line.

use axum::extract::{FromRef, FromRequest, FromRequestParts, Path, Request};
use axum::http::request::Parts;
use serde::de::DeserializeOwned;
use serde_json::error::Category;

use super::handlers::AppState;
use crate::service::context::RequestContext;
use crate::service::error::{ApiError, BodyError, InvalidId};

// ---------------------------------------------------------------------------
// JsonBody
// ---------------------------------------------------------------------------

/// JSON request body, read under the request deadline.
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let limit = AppState::from_ref(state).config.max_body_bytes;
        let ctx = RequestContext::from_extensions(req.extensions());

        let bytes = match ctx
            .deadline()
            .run(axum::body::to_bytes(req.into_body(), limit))
            .await
        {
            Ok(Ok(bytes)) => bytes,
            Ok(Err(err)) => return Err(ctx.reject(BodyError::Read(err))),
            Err(elapsed) => return Err(ctx.reject(BodyError::from(elapsed))),
        };

        decode_json(&bytes)
            .map(JsonBody)
            .map_err(|err| ctx.reject(err))
    }
}

/// Decodes a JSON document, separating the failure modes the classifier
/// distinguishes.
///
/// # Errors
///
/// - [`BodyError::Empty`] for an empty or whitespace-only body
/// - [`BodyError::Type`] for well-formed JSON with values of the wrong type
/// - [`BodyError::Syntax`] for anything else, truncated documents included
pub fn decode_json<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, BodyError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(BodyError::Empty);
    }
    serde_json::from_slice(bytes).map_err(|err| match err.classify() {
        Category::Data => BodyError::Type(err),
        Category::Syntax | Category::Eof | Category::Io => BodyError::Syntax(err),
    })
}

// ---------------------------------------------------------------------------
// NoteId
// ---------------------------------------------------------------------------

/// The `{id}` path segment, guaranteed to be a positive integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteId(pub i64);

impl<S: Send + Sync> FromRequestParts<S> for NoteId {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let ctx = RequestContext::from_extensions(&parts.extensions);
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| {
                // A missing or miscounted parameter is a routing bug, not bad input.
                if rejection.status().is_client_error() {
                    ctx.reject(InvalidId::Malformed(rejection.body_text()))
                } else {
                    ctx.reject(anyhow::anyhow!(
                        "path parameter rejected: {}",
                        rejection.body_text()
                    ))
                }
            })?;
        parse_id(&raw).map(NoteId).map_err(|err| ctx.reject(err))
    }
}

/// Parses a note id.
///
/// # Errors
///
/// Returns [`InvalidId`] if `raw` is not a base-10 `i64` or is not positive.
pub fn parse_id(raw: &str) -> Result<i64, InvalidId> {
    let id: i64 = raw.parse().map_err(|source| InvalidId::Parse {
        raw: raw.to_string(),
        source,
    })?;
    if id <= 0 {
        return Err(InvalidId::NotPositive(id));
    }
    Ok(id)
}
