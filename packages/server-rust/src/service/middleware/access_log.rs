//! Access logging on top of `tower_http::trace`: a `START` line on entry and
//! an `END` line with the final status and duration.
//!
//! Every line is emitted inside a `request` span carrying the request id,
//! method, path, client address and user agent, so both lines can be tied
//! back to one request.

use std::time::Duration;

use axum::body::Body;
use axum::http::header::USER_AGENT;
use axum::http::{Request, Response};
use tower::Layer;
use tower_http::classify::{
    NeverClassifyEos, ServerErrorsAsFailures, ServerErrorsFailureClass, SharedClassifier,
};
use tower_http::map_response_body::{MapResponseBody, MapResponseBodyLayer};
use tower_http::trace::{MakeSpan, OnRequest, OnResponse, ResponseBody, Trace, TraceLayer};
use tracing::{info, info_span, Span};

use crate::service::context::{client_addr, RequestId};

// ---------------------------------------------------------------------------
// Span and event hooks
// ---------------------------------------------------------------------------

/// Opens the `request` span that both access log lines are recorded in.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestSpan;

impl<B> MakeSpan<B> for RequestSpan {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        let user_agent = request
            .headers()
            .get(USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-");

        info_span!(
            "request",
            request_id = %RequestId::from_extensions(request.extensions()),
            method = %request.method(),
            path = %request.uri().path(),
            remote_addr = %client_addr(request.extensions()),
            user_agent = %user_agent,
        )
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LogStart;

impl<B> OnRequest<B> for LogStart {
    fn on_request(&mut self, _request: &Request<B>, _span: &Span) {
        info!("START");
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LogEnd;

impl<B> OnResponse<B> for LogEnd {
    fn on_response(self, response: &Response<B>, latency: Duration, _span: &Span) {
        info!(
            status = response.status().as_u16(),
            duration_ms = latency.as_secs_f64() * 1000.0,
            "END"
        );
    }
}

// ---------------------------------------------------------------------------
// AccessLogLayer
// ---------------------------------------------------------------------------

type AccessTrace = TraceLayer<
    SharedClassifier<ServerErrorsAsFailures>,
    RequestSpan,
    LogStart,
    LogEnd,
    (),
    (),
    (),
>;

type TracedBody = ResponseBody<Body, NeverClassifyEos<ServerErrorsFailureClass>, (), (), ()>;

type IntoBody = fn(TracedBody) -> Body;

/// Tower layer emitting one `START` and one `END` line per request.
///
/// The traced response body is boxed back into an axum [`Body`] so the
/// layers above keep working with plain `Response` values. Panics below this
/// layer unwind through it; the failure interceptor above logs those
/// instead, and no `END` line is written for them.
#[derive(Debug, Clone)]
pub struct AccessLogLayer {
    trace: AccessTrace,
}

impl AccessLogLayer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            trace: TraceLayer::new_for_http()
                .make_span_with(RequestSpan)
                .on_request(LogStart)
                .on_response(LogEnd)
                .on_body_chunk(())
                .on_eos(())
                .on_failure(()),
        }
    }
}

impl Default for AccessLogLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Layer<S> for AccessLogLayer {
    type Service = MapResponseBody<
        Trace<
            S,
            SharedClassifier<ServerErrorsAsFailures>,
            RequestSpan,
            LogStart,
            LogEnd,
            (),
            (),
            (),
        >,
        IntoBody,
    >;

    fn layer(&self, inner: S) -> Self::Service {
        MapResponseBodyLayer::new(Body::new as IntoBody).layer(self.trace.layer(inner))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
