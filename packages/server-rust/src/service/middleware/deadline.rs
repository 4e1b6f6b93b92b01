//! Deadline middleware: bounds the lifetime of each request.
//!
//! This layer only attaches a [`Deadline`]; it never produces a response.
//! Store and body operations run through [`Deadline::run`] and report
//! [`DeadlineExceeded`](crate::service::context::DeadlineExceeded), which
//! reaches the client through the error classifier.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::extract::Request;
use axum::response::Response;
use tower::{Layer, Service};

use crate::service::context::{Deadline, DEFAULT_REQUEST_TIMEOUT};

// ---------------------------------------------------------------------------
// DeadlineLayer
// ---------------------------------------------------------------------------

/// Tower layer that attaches `now + timeout` as the request deadline.
///
/// If an outer deadline is already attached, the earlier of the two wins.
#[derive(Debug, Clone, Copy)]
pub struct DeadlineLayer {
    timeout: Duration,
}

impl DeadlineLayer {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for DeadlineLayer {
    fn default() -> Self {
        Self::new(DEFAULT_REQUEST_TIMEOUT)
    }
}

impl<S> Layer<S> for DeadlineLayer {
    type Service = DeadlineService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        DeadlineService {
            inner,
            timeout: self.timeout,
        }
    }
}

// ---------------------------------------------------------------------------
// DeadlineService
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct DeadlineService<S> {
    inner: S,
    timeout: Duration,
}

impl<S> Service<Request> for DeadlineService<S>
where
    S: Service<Request, Response = Response> + Send,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        let own = Deadline::after(self.timeout);
        let deadline = req
            .extensions()
            .get::<Deadline>()
            .map_or(own, |outer| (*outer).min(own));
        req.extensions_mut().insert(deadline);

        Box::pin(self.inner.call(req))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use axum::body::Body;
    use axum::http::StatusCode;
    use tower::{service_fn, ServiceExt};

    use super::*;

    /// Reports the budget left on the attached deadline, in milliseconds.
    async fn report_remaining(req: Request) -> Result<Response, Infallible> {
        let remaining = req
            .extensions()
            .get::<Deadline>()
            .map_or(0, |d| d.remaining().as_millis());
        Ok(Response::new(Body::from(remaining.to_string())))
    }

    async fn remaining_ms(layer: DeadlineLayer, req: Request) -> u128 {
        let svc = layer.layer(service_fn(report_remaining));
        let response = svc.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(body.to_vec()).unwrap().parse().unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn attaches_deadline_from_timeout() {
        let req = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(
            remaining_ms(DeadlineLayer::new(Duration::from_millis(500)), req).await,
            500
        );
    }

    #[tokio::test(start_paused = true)]
    async fn earlier_outer_deadline_wins() {
        let mut req = Request::builder().body(Body::empty()).unwrap();
        req.extensions_mut()
            .insert(Deadline::after(Duration::from_millis(100)));
        assert_eq!(
            remaining_ms(DeadlineLayer::new(Duration::from_secs(3)), req).await,
            100
        );
    }

    #[tokio::test(start_paused = true)]
    async fn default_timeout_is_three_seconds() {
        let req = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(remaining_ms(DeadlineLayer::default(), req).await, 3000);
    }
}
