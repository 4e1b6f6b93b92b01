//! Write-once response slot.
//!
//! Every component that may produce a response for a request (handler
//! error path, failure interceptor) writes into a [`ResponseSink`]. Only the
//! first write takes effect, so a request never receives two responses.

use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

#[derive(Debug)]
struct Written {
    status: StatusCode,
    content_type: Option<HeaderValue>,
    body: Vec<u8>,
}

/// Response decorator that records the first status and body written to it.
#[derive(Debug, Default)]
pub struct ResponseSink {
    written: Option<Written>,
}

impl ResponseSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a response. Returns `false` and changes nothing if a response
    /// was already written.
    pub fn write(
        &mut self,
        status: StatusCode,
        content_type: Option<HeaderValue>,
        body: impl Into<Vec<u8>>,
    ) -> bool {
        if self.written.is_some() {
            return false;
        }
        self.written = Some(Written {
            status,
            content_type,
            body: body.into(),
        });
        true
    }

    /// Records a JSON response.
    ///
    /// Serialization of the plain payloads used here cannot fail; if it
    /// does, an empty object is written instead so the status still lands.
    pub fn write_json<T: Serialize>(&mut self, status: StatusCode, payload: &T) -> bool {
        let body = serde_json::to_vec(payload).unwrap_or_else(|_| b"{}".to_vec());
        self.write(
            status,
            Some(HeaderValue::from_static("application/json")),
            body,
        )
    }

    /// Status recorded by the first write, if any.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        self.written.as_ref().map(|w| w.status)
    }

    #[must_use]
    pub fn is_written(&self) -> bool {
        self.written.is_some()
    }
}

impl IntoResponse for ResponseSink {
    fn into_response(self) -> Response {
        let Some(written) = self.written else {
            return StatusCode::OK.into_response();
        };
        let mut response = Response::new(Body::from(written.body));
        *response.status_mut() = written.status;
        if let Some(content_type) = written.content_type {
            response
                .headers_mut()
                .insert(header::CONTENT_TYPE, content_type);
        }
        response
    }
}
