//! Core types shared by the modelsync crates
//!
//! - **Correlation types**: RequestId, TraceId, SpanId, RequestContext for tying a
//!   shell invocation to its log lines and errors
//! - **Schema constants**: canonical field keys and event names used by the
//!   logging macros

pub mod correlation;
pub mod schema;

pub use correlation::{RequestContext, RequestId, SpanId, TraceId};
