//! Per-request context: correlation identifier and deadline.
//!
//! The pipeline layers insert a [`RequestId`] and a [`Deadline`] into the
//! request extensions; handlers read both back through the
//! [`RequestContext`] extractor. Values are only ever added, never removed,
//! and live exactly as long as the request.

use std::convert::Infallible;
use std::fmt;
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use axum::http::{Extensions, HeaderName, HeaderValue};
use notes_core::Validate;
use tokio::time::Instant;
use uuid::Uuid;

use super::error::{ApiError, AppError};

/// Header carrying the correlation identifier, in both directions.
pub static REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("request-id");

/// Deadline applied when a request reaches a handler without one.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(3);

// ---------------------------------------------------------------------------
// RequestId
// ---------------------------------------------------------------------------

/// Correlation identifier naming one request in every log line it produces.
///
/// Always a syntactically valid UUID: either echoed from the caller or
/// freshly generated.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(String);

impl RequestId {
    /// Generates a fresh random (v4) identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Accepts a caller-supplied header value if it parses as a UUID.
    ///
    /// The caller's exact spelling is kept so the echoed header matches
    /// what was sent.
    #[must_use]
    pub fn from_header(value: &HeaderValue) -> Option<Self> {
        let raw = value.to_str().ok()?;
        Uuid::try_parse(raw).ok()?;
        Some(Self(raw.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Reads the identifier a pipeline layer attached, or generates one when
    /// the request never passed through the correlation layer.
    #[must_use]
    pub fn from_extensions(extensions: &Extensions) -> Self {
        extensions
            .get::<Self>()
            .cloned()
            .unwrap_or_else(Self::generate)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Deadline
// ---------------------------------------------------------------------------

/// Returned when an operation is still running at its request's deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("context deadline exceeded")]
pub struct DeadlineExceeded;

/// Instant after which a request's remaining work is abandoned.
///
/// Ordered by expiry so a child deadline can be derived with `min`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Deadline {
    at: Instant,
}

impl Deadline {
    /// A deadline `timeout` from now.
    #[must_use]
    pub fn after(timeout: Duration) -> Self {
        Self {
            at: Instant::now() + timeout,
        }
    }

    #[must_use]
    pub fn at(&self) -> Instant {
        self.at
    }

    /// Time left before expiry, zero once elapsed.
    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    #[must_use]
    pub fn is_elapsed(&self) -> bool {
        Instant::now() >= self.at
    }

    /// Runs `fut` until it completes or the deadline passes.
    ///
    /// On expiry the future is dropped, cancelling whatever it was waiting
    /// on, and the timer is released with it.
    ///
    /// # Errors
    ///
    /// Returns [`DeadlineExceeded`] if the deadline elapses first.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, DeadlineExceeded> {
        tokio::time::timeout_at(self.at, fut)
            .await
            .map_err(|_elapsed| DeadlineExceeded)
    }

    /// Reads the deadline a pipeline layer attached, falling back to
    /// [`DEFAULT_REQUEST_TIMEOUT`] from now.
    #[must_use]
    pub fn from_extensions(extensions: &Extensions) -> Self {
        extensions
            .get::<Self>()
            .copied()
            .unwrap_or_else(|| Self::after(DEFAULT_REQUEST_TIMEOUT))
    }
}

// ---------------------------------------------------------------------------
// RequestContext
// ---------------------------------------------------------------------------

/// Handler-facing view of the per-request context.
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: RequestId,
    deadline: Deadline,
}

impl RequestContext {
    #[must_use]
    pub fn new(request_id: RequestId, deadline: Deadline) -> Self {
        Self {
            request_id,
            deadline,
        }
    }

    /// Assembles the context from what the pipeline layers attached.
    #[must_use]
    pub fn from_extensions(extensions: &Extensions) -> Self {
        Self::new(
            RequestId::from_extensions(extensions),
            Deadline::from_extensions(extensions),
        )
    }

    #[must_use]
    pub fn request_id(&self) -> &RequestId {
        &self.request_id
    }

    #[must_use]
    pub fn deadline(&self) -> Deadline {
        self.deadline
    }

    /// Runs a fallible store operation under the request deadline.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] tagged with this request's id if the
    /// operation fails or the deadline elapses.
    pub async fn run<T, E, F>(&self, fut: F) -> Result<T, ApiError>
    where
        F: Future<Output = Result<T, E>>,
        AppError: From<E>,
    {
        match self.deadline.run(fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(self.reject(err)),
            Err(elapsed) => Err(self.reject(elapsed)),
        }
    }

    /// Validates a decoded request body.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] wrapping the validation failure.
    pub fn validate<T: Validate>(&self, value: &T) -> Result<(), ApiError> {
        value.validate().map_err(|err| self.reject(err))
    }

    /// Tags a raw error with this request's id for classification.
    pub fn reject(&self, err: impl Into<AppError>) -> ApiError {
        ApiError::new(self.request_id.clone(), err.into())
    }
}

impl<S: Send + Sync> FromRequestParts<S> for RequestContext {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_extensions(&parts.extensions))
    }
}

/// Remote peer address for logging, `"unknown"` when the server was not
/// started with connect info (e.g. in-process tests).
#[must_use]
pub fn client_addr(extensions: &Extensions) -> String {
    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map_or_else(|| "unknown".to_string(), |ConnectInfo(addr)| addr.to_string())
}
