//! Pipeline composition: the request lifecycle layers in their fixed order.

use std::time::Duration;

use tower::layer::util::{Identity, Stack};
use tower::ServiceBuilder;

use super::access_log::AccessLogLayer;
use super::correlation::CorrelationLayer;
use super::deadline::DeadlineLayer;
use super::recovery::RecoveryLayer;

/// The composed layer produced by [`build_request_pipeline`].
pub type RequestPipeline = Stack<
    AccessLogLayer,
    Stack<RecoveryLayer, Stack<DeadlineLayer, Stack<CorrelationLayer, Identity>>>,
>;

/// Builds the request pipeline.
///
/// Layer order (outermost to innermost):
/// 1. `CorrelationLayer` -- assign the request id before anything logs
/// 2. `DeadlineLayer` -- bound the request with `timeout`
/// 3. `RecoveryLayer` -- catch panics from everything below
/// 4. `AccessLogLayer` -- `START`/`END` lines around the handler
#[must_use]
pub fn build_request_pipeline(timeout: Duration) -> RequestPipeline {
    ServiceBuilder::new()
        .layer(CorrelationLayer)
        .layer(DeadlineLayer::new(timeout))
        .layer(RecoveryLayer::new())
        .layer(AccessLogLayer::new())
        .into_inner()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
