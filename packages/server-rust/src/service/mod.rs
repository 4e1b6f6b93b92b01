//! Request lifecycle: per-request context, the middleware pipeline, and
//! error classification.
//!
//! 1. **Context** (`context`): `RequestId`, `Deadline`, the `RequestContext` extractor
//! 2. **Middleware** (`middleware`): correlation, deadline, recovery, access-log layers
//! 3. **Errors** (`error`): typed handler errors and the `ApiError` response type
//! 4. **Classification** (`classify`): error -> (status, public message, log reason)
//! 5. **Sink** (`sink`): write-once response slot shared by every responder

pub mod classify;
pub mod context;
pub mod error;
pub mod middleware;
pub mod sink;

pub use classify::{classify, respond, ClassifiedError, ErrorKind};
pub use context::{Deadline, DeadlineExceeded, RequestContext, RequestId, REQUEST_ID_HEADER};
pub use error::{ApiError, AppError, BodyError, InvalidId};
pub use sink::ResponseSink;
