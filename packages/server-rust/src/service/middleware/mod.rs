//! Tower layers forming the fixed per-request pipeline.
//!
//! - [`correlation`]: assigns and echoes the `Request-ID`
//! - [`deadline`]: attaches the request deadline
//! - [`recovery`]: converts panics into logged 500 responses
//! - [`access_log`]: `START`/`END` lines per request
//! - [`pipeline`]: composes the layers in their fixed order

pub mod access_log;
pub mod correlation;
pub mod deadline;
pub mod pipeline;
pub mod recovery;

pub use access_log::AccessLogLayer;
pub use correlation::CorrelationLayer;
pub use deadline::DeadlineLayer;
pub use pipeline::{build_request_pipeline, RequestPipeline};
pub use recovery::{install_panic_hook, RecoveryLayer};
