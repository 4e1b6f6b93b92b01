//! HTTP middleware stack for the notes server.
//!
//! Combines the request pipeline with CORS. Ordering follows the
//! outer-to-inner convention: the first layer listed is the outermost
//! (processes the request first on the way in, and the response last on
//! the way out).

use axum::http::Method;
use tower::layer::util::{Identity, Stack};
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use super::config::NetworkConfig;
use crate::service::context::REQUEST_ID_HEADER;
use crate::service::middleware::{build_request_pipeline, RequestPipeline};

/// The composed Tower layer type produced by [`build_http_layers`].
pub type HttpLayers = Stack<CorsLayer, Stack<RequestPipeline, Identity>>;

/// Builds the HTTP-level Tower middleware stack from the network configuration.
///
/// **Middleware ordering (outermost to innermost):**
/// 1. `Correlation` -- assigns or echoes the `Request-ID`
/// 2. `Deadline` -- attaches `now + request_timeout`
/// 3. `Recovery` -- turns panics into logged 500 responses
/// 4. `AccessLog` -- `START`/`END` lines with status and duration
/// 5. `CORS` -- Cross-Origin Resource Sharing based on configured origins
#[must_use]
pub fn build_http_layers(config: &NetworkConfig) -> HttpLayers {
    ServiceBuilder::new()
        .layer(build_request_pipeline(config.request_timeout))
        .layer(build_cors_layer(&config.cors_origins))
        .into_inner()
}

/// Builds the CORS layer from the configured list of allowed origins.
///
/// A wildcard `"*"` in the origins list allows any origin. Otherwise,
/// each origin string is parsed and added to an explicit allowlist.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let parsed: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers(Any)
        .expose_headers([REQUEST_ID_HEADER.clone()])
}
