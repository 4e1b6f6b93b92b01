//! Failure interception: turns a panic anywhere below this layer into a
//! logged 500 response instead of a dropped connection.
//!
//! Each call and each poll of the inner future runs inside
//! `catch_unwind`. A process-wide panic hook, installed once, records a
//! backtrace for panics raised while such a scope is active; panics anywhere
//! else are forwarded to the previously installed hook.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::Once;
use std::task::{Context, Poll};

use axum::extract::Request;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tower::{Layer, Service};
use tracing::error;

use crate::service::classify::ErrorKind;
use crate::service::context::{client_addr, RequestId};
use crate::service::sink::ResponseSink;

thread_local! {
    static PROTECTED: Cell<usize> = const { Cell::new(0) };
    static LAST_BACKTRACE: RefCell<Option<Backtrace>> = const { RefCell::new(None) };
}

static HOOK: Once = Once::new();

/// Installs the backtrace-recording panic hook. Idempotent.
pub fn install_panic_hook() {
    HOOK.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            if PROTECTED.with(Cell::get) > 0 {
                let backtrace = Backtrace::force_capture();
                LAST_BACKTRACE.with(|slot| *slot.borrow_mut() = Some(backtrace));
            } else {
                previous(info);
            }
        }));
    });
}

/// A panic caught inside a protected scope.
#[derive(Debug)]
pub struct CaughtPanic {
    pub message: String,
    pub backtrace: Option<Backtrace>,
}

impl CaughtPanic {
    fn from_payload(payload: &(dyn Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self {
            message,
            backtrace: LAST_BACKTRACE.with(|slot| slot.borrow_mut().take()),
        }
    }

    fn stack(&self) -> String {
        self.backtrace
            .as_ref()
            .map_or_else(|| "<unavailable>".to_string(), ToString::to_string)
    }
}

/// Runs `f`, converting a panic into [`CaughtPanic`].
fn protect<R>(f: impl FnOnce() -> R) -> Result<R, CaughtPanic> {
    PROTECTED.with(|depth| depth.set(depth.get() + 1));
    let result = catch_unwind(AssertUnwindSafe(f));
    PROTECTED.with(|depth| depth.set(depth.get() - 1));
    result.map_err(|payload| CaughtPanic::from_payload(payload.as_ref()))
}

/// Future adapter that protects every poll of `inner`.
struct CatchPanic<F> {
    inner: Pin<Box<F>>,
}

impl<F: Future> Future for CatchPanic<F> {
    type Output = Result<F::Output, CaughtPanic>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let inner = self.inner.as_mut();
        match protect(|| inner.poll(cx)) {
            Ok(Poll::Ready(output)) => Poll::Ready(Ok(output)),
            Ok(Poll::Pending) => Poll::Pending,
            Err(caught) => Poll::Ready(Err(caught)),
        }
    }
}

// ---------------------------------------------------------------------------
// RecoveryLayer
// ---------------------------------------------------------------------------

/// Tower layer that converts panics in inner layers and handlers into a
/// generic 500 response.
#[derive(Debug, Clone, Copy)]
pub struct RecoveryLayer;

impl RecoveryLayer {
    /// Creates the layer and makes sure the panic hook is installed.
    #[must_use]
    pub fn new() -> Self {
        install_panic_hook();
        Self
    }
}

impl Default for RecoveryLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Layer<S> for RecoveryLayer {
    type Service = RecoveryService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RecoveryService { inner }
    }
}

// ---------------------------------------------------------------------------
// RecoveryService
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RecoveryService<S> {
    inner: S,
}

impl<S> Service<Request> for RecoveryService<S>
where
    S: Service<Request, Response = Response> + Send,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let request_id = RequestId::from_extensions(req.extensions());
        let method = req.method().clone();
        let uri = req.uri().clone();
        let remote_addr = client_addr(req.extensions());

        let called = protect(|| self.inner.call(req));

        Box::pin(async move {
            let caught = match called {
                Ok(fut) => match (CatchPanic { inner: Box::pin(fut) }).await {
                    Ok(result) => return result,
                    Err(caught) => caught,
                },
                Err(caught) => caught,
            };

            error!(
                request_id = %request_id,
                method = %method,
                uri = %uri,
                remote_addr = %remote_addr,
                panic = %caught.message,
                stack = %caught.stack(),
                "recovered from panic"
            );

            let mut sink = ResponseSink::new();
            sink.write_json(
                StatusCode::INTERNAL_SERVER_ERROR,
                &json!({ "error": ErrorKind::Internal.public_message() }),
            );
            Ok(sink.into_response())
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
