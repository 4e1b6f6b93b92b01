//! Error classification: maps handler errors onto the public error taxonomy.
//!
//! Classification walks the error and its `source()` chain through an
//! ordered list of predicates; the first predicate that matches decides the
//! [`ErrorKind`]. Matching is by concrete type and variant only.

use std::error::Error;
use std::num::ParseIntError;

use axum::http::StatusCode;
use notes_core::ValidationErrors;
use serde_json::json;
use tracing::{error, warn};

use super::context::{DeadlineExceeded, RequestId};
use super::error::{AppError, BodyError, InvalidId};
use super::sink::ResponseSink;
use crate::storage::StoreError;

// ---------------------------------------------------------------------------
// ErrorKind
// ---------------------------------------------------------------------------

/// Closed set of outcomes an error can be classified into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Timeout,
    NotFound,
    EmptyBody,
    JsonSyntax,
    JsonType,
    UnreadableBody,
    InvalidValue,
    Validation,
    Internal,
}

impl ErrorKind {
    /// HTTP status returned to the client.
    #[must_use]
    pub fn status(self) -> StatusCode {
        match self {
            Self::Timeout => StatusCode::REQUEST_TIMEOUT,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::EmptyBody
            | Self::JsonSyntax
            | Self::JsonType
            | Self::UnreadableBody
            | Self::InvalidValue
            | Self::Validation => StatusCode::BAD_REQUEST,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-safe message. Never contains details of the underlying error.
    #[must_use]
    pub fn public_message(self) -> &'static str {
        match self {
            Self::Timeout => "request timed out",
            Self::NotFound => "not found",
            Self::EmptyBody | Self::JsonSyntax | Self::JsonType | Self::UnreadableBody => {
                "malformed request body"
            }
            Self::InvalidValue => "invalid input value",
            Self::Validation => "validation failed",
            Self::Internal => "internal error",
        }
    }

    /// Operator-facing reason recorded in the log line.
    #[must_use]
    pub fn log_reason(self) -> &'static str {
        match self {
            Self::Timeout => "deadline exceeded",
            Self::NotFound => "no rows",
            Self::EmptyBody => "empty request body",
            Self::JsonSyntax => "malformed JSON syntax",
            Self::JsonType => "JSON type mismatch",
            Self::UnreadableBody => "unreadable request body",
            Self::InvalidValue => "invalid numeric value",
            Self::Validation => "validation failed",
            Self::Internal => "unclassified error",
        }
    }
}

// ---------------------------------------------------------------------------
// Predicate chain
// ---------------------------------------------------------------------------

type Predicate = fn(&(dyn Error + 'static)) -> bool;

/// Evaluated in order; the first kind whose predicate matches any error in
/// the chain wins.
const RULES: &[(ErrorKind, Predicate)] = &[
    (ErrorKind::Timeout, is_deadline),
    (ErrorKind::NotFound, is_no_rows),
    (ErrorKind::EmptyBody, is_empty_body),
    (ErrorKind::JsonSyntax, is_json_syntax),
    (ErrorKind::JsonType, is_json_type),
    (ErrorKind::UnreadableBody, is_unreadable_body),
    (ErrorKind::InvalidValue, is_invalid_value),
    (ErrorKind::Validation, is_validation),
];

fn is_deadline(e: &(dyn Error + 'static)) -> bool {
    e.is::<DeadlineExceeded>()
}

fn is_no_rows(e: &(dyn Error + 'static)) -> bool {
    matches!(
        e.downcast_ref::<StoreError>(),
        Some(StoreError::NotFound | StoreError::NoRowsAffected)
    )
}

fn is_empty_body(e: &(dyn Error + 'static)) -> bool {
    matches!(e.downcast_ref::<BodyError>(), Some(BodyError::Empty))
}

// JSON shape checks only look at body errors, so a serde error raised
// elsewhere (e.g. by the store) can never be reported as a bad body.
fn is_json_syntax(e: &(dyn Error + 'static)) -> bool {
    matches!(e.downcast_ref::<BodyError>(), Some(BodyError::Syntax(_)))
}

fn is_json_type(e: &(dyn Error + 'static)) -> bool {
    matches!(e.downcast_ref::<BodyError>(), Some(BodyError::Type(_)))
}

fn is_unreadable_body(e: &(dyn Error + 'static)) -> bool {
    matches!(e.downcast_ref::<BodyError>(), Some(BodyError::Read(_)))
}

fn is_invalid_value(e: &(dyn Error + 'static)) -> bool {
    e.is::<InvalidId>() || e.is::<ParseIntError>()
}

fn is_validation(e: &(dyn Error + 'static)) -> bool {
    e.is::<ValidationErrors>()
}

fn chain<'a>(
    err: &'a (dyn Error + 'static),
) -> impl Iterator<Item = &'a (dyn Error + 'static)> {
    std::iter::successors(Some(err), |e: &&'a (dyn Error + 'static)| (*e).source())
}

/// Computes the [`ErrorKind`] of an arbitrary error.
#[must_use]
pub fn kind_of(err: &(dyn Error + 'static)) -> ErrorKind {
    RULES
        .iter()
        .find(|(_, matches)| chain(err).any(*matches))
        .map_or(ErrorKind::Internal, |(kind, _)| *kind)
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// The (status, public message, log reason) triple for one error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassifiedError {
    pub kind: ErrorKind,
    pub status: StatusCode,
    pub public_message: &'static str,
    pub log_reason: &'static str,
}

impl From<ErrorKind> for ClassifiedError {
    fn from(kind: ErrorKind) -> Self {
        Self {
            kind,
            status: kind.status(),
            public_message: kind.public_message(),
            log_reason: kind.log_reason(),
        }
    }
}

#[must_use]
pub fn classify(err: &AppError) -> ClassifiedError {
    kind_of(err).into()
}

/// Classifies `err`, logs it, and writes the public error body into `sink`.
///
/// Returns `true` only when this call produced the response. With no error,
/// or with a sink that already holds a response, nothing is logged or
/// written.
pub fn respond(sink: &mut ResponseSink, err: Option<&AppError>, request_id: &RequestId) -> bool {
    let Some(err) = err else {
        return false;
    };
    if sink.is_written() {
        return false;
    }
    let classified = classify(err);
    let status = classified.status.as_u16();

    if classified.status.is_server_error() {
        error!(
            request_id = %request_id,
            status,
            reason = classified.log_reason,
            error = %err,
            "request failed"
        );
    } else {
        warn!(
            request_id = %request_id,
            status,
            reason = classified.log_reason,
            error = %err,
            "request rejected"
        );
    }

    sink.write_json(
        classified.status,
        &json!({ "error": classified.public_message }),
    )
}
