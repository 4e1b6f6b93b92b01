//! Typed errors surfaced by request handlers.
//!
//! Each layer owns its error enum; [`AppError`] is the union handlers
//! return. Every wrapping variant reports its cause through `source()`, so
//! the classifier can walk the chain and match on exact types.

use std::num::ParseIntError;

use axum::response::{IntoResponse, Response};
use notes_core::ValidationErrors;

use super::classify;
use super::context::{DeadlineExceeded, RequestId};
use super::sink::ResponseSink;
use crate::storage::StoreError;

/// Failure while reading or decoding a JSON request body.
#[derive(Debug, thiserror::Error)]
pub enum BodyError {
    /// The body was empty or whitespace only.
    #[error("request body is empty")]
    Empty,
    /// The body is not syntactically valid JSON (includes truncation).
    #[error("malformed JSON body: {0}")]
    Syntax(#[source] serde_json::Error),
    /// Valid JSON whose values do not fit the expected types.
    #[error("JSON body has wrong value type: {0}")]
    Type(#[source] serde_json::Error),
    /// The body stream failed or exceeded the size limit.
    #[error("failed to read request body: {0}")]
    Read(#[source] axum::Error),
    /// The request deadline elapsed while the body was being read.
    #[error("{0}")]
    Deadline(#[from] DeadlineExceeded),
}

/// A `{id}` path segment that is not a positive integer.
#[derive(Debug, thiserror::Error)]
pub enum InvalidId {
    #[error("invalid id {raw:?}: {source}")]
    Parse {
        raw: String,
        #[source]
        source: ParseIntError,
    },
    #[error("id must be positive, got {0}")]
    NotPositive(i64),
    /// The segment could not be decoded at all (e.g. invalid UTF-8).
    #[error("undecodable id segment: {0}")]
    Malformed(String),
}

/// Every error a handler can report.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Store(#[from] StoreError),
    #[error("{0}")]
    Body(#[from] BodyError),
    #[error("{0}")]
    InvalidId(#[from] InvalidId),
    #[error("{0}")]
    Validation(#[from] ValidationErrors),
    #[error("{0}")]
    Deadline(#[from] DeadlineExceeded),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// An [`AppError`] tagged with the request it belongs to.
///
/// Converting it into a response runs the classifier, which logs the raw
/// error and renders the public `{"error": ...}` body.
#[derive(Debug)]
pub struct ApiError {
    request_id: RequestId,
    error: AppError,
}

impl ApiError {
    #[must_use]
    pub fn new(request_id: RequestId, error: AppError) -> Self {
        Self { request_id, error }
    }

    #[must_use]
    pub fn request_id(&self) -> &RequestId {
        &self.request_id
    }

    #[must_use]
    pub fn error(&self) -> &AppError {
        &self.error
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut sink = ResponseSink::new();
        classify::respond(&mut sink, Some(&self.error), &self.request_id);
        sink.into_response()
    }
}
