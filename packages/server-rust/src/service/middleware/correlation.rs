//! Correlation middleware: one [`RequestId`] per request, echoed back.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::extract::Request;
use axum::http::HeaderValue;
use axum::response::Response;
use tower::{Layer, Service};

use crate::service::context::{RequestId, REQUEST_ID_HEADER};

// ---------------------------------------------------------------------------
// CorrelationLayer
// ---------------------------------------------------------------------------

/// Tower layer that tags every request with a [`RequestId`].
///
/// A caller-supplied `Request-ID` header is reused when it is a valid UUID;
/// otherwise a fresh one is generated. The id is stored in the request
/// extensions and set on the response under the same header.
#[derive(Debug, Clone, Copy, Default)]
pub struct CorrelationLayer;

impl<S> Layer<S> for CorrelationLayer {
    type Service = CorrelationService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CorrelationService { inner }
    }
}

// ---------------------------------------------------------------------------
// CorrelationService
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CorrelationService<S> {
    inner: S,
}

impl<S> Service<Request> for CorrelationService<S>
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

    fn call(&mut self, mut req: Request) -> Self::Future {
        let request_id = req
            .headers()
            .get(&REQUEST_ID_HEADER)
            .and_then(RequestId::from_header)
            .unwrap_or_else(RequestId::generate);
        req.extensions_mut().insert(request_id.clone());

        let fut = self.inner.call(req);
        Box::pin(async move {
            let mut response = fut.await?;
            if let Ok(value) = HeaderValue::from_str(request_id.as_str()) {
                response
                    .headers_mut()
                    .insert(REQUEST_ID_HEADER.clone(), value);
            }
            Ok(response)
        })
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
    use proptest::prelude::*;
    use tower::{service_fn, ServiceExt};
    use uuid::Uuid;

    use super::*;

    /// Echoes the id found in the extensions as the response body.
    async fn echo_id(req: Request) -> Result<Response, Infallible> {
        let id = req
            .extensions()
            .get::<RequestId>()
            .map(ToString::to_string)
            .unwrap_or_default();
        Ok(Response::new(Body::from(id)))
    }

    async fn roundtrip(header: Option<&str>) -> (String, String) {
        let svc = CorrelationLayer.layer(service_fn(echo_id));
        let mut builder = Request::builder().uri("/");
        if let Some(value) = header {
            builder = builder.header("Request-ID", value);
        }
        let response = svc
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let header = response.headers()[&REQUEST_ID_HEADER]
            .to_str()
            .unwrap()
            .to_string();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (header, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn generates_id_when_absent() {
        let (header, seen) = roundtrip(None).await;
        assert!(Uuid::try_parse(&header).is_ok());
        assert_eq!(header, seen);
    }

    #[tokio::test]
    async fn echoes_valid_caller_id() {
        let id = "0b6e4c8e-52f5-4a77-8f2a-1d3c5e7f9a0b";
        let (header, seen) = roundtrip(Some(id)).await;
        assert_eq!(header, id);
        assert_eq!(seen, id);
    }

    #[tokio::test]
    async fn replaces_invalid_caller_id() {
        let (header, _) = roundtrip(Some("definitely-not-a-uuid")).await;
        assert_ne!(header, "definitely-not-a-uuid");
        assert!(Uuid::try_parse(&header).is_ok());
    }

    #[tokio::test]
    async fn generated_ids_differ_between_requests() {
        let (a, _) = roundtrip(None).await;
        let (b, _) = roundtrip(None).await;
        assert_ne!(a, b);
    }

    fn run<F: Future>(fut: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(fut)
    }

    proptest! {
        #[test]
        fn response_id_is_caller_uuid_or_fresh(raw in "[ -~]{0,40}") {
            let (header, _) = run(roundtrip(Some(&raw)));
            prop_assert!(Uuid::try_parse(&header).is_ok());
            if Uuid::try_parse(&raw).is_ok() {
                prop_assert_eq!(header, raw);
            } else {
                prop_assert_ne!(header, raw);
            }
        }

        #[test]
        fn any_uuid_is_echoed(bytes in any::<[u8; 16]>()) {
            let id = Uuid::from_bytes(bytes).to_string();
            let (header, _) = run(roundtrip(Some(&id)));
            prop_assert_eq!(header, id);
        }
    }
}
