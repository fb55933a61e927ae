//! # Middleware Stack
//!
//! Tower middleware for the API layer:
//! - [`tracing_layer`]: request/response tracing with `TraceLayer`, tagged
//!   with the request id.
//! - [`metrics`]: Prometheus request metrics.

pub mod metrics;
pub mod tracing_layer;
