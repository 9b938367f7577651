//! Canonical schema constants for structured logging
//!
//! The logging macros and the mapper use these keys so captured events can be
//! asserted on by name.

// Canonical field keys
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";
pub const FIELD_REQUEST_ID: &str = "request_id";
pub const FIELD_TRACE_ID: &str = "trace_id";
pub const FIELD_SPAN_ID: &str = "span_id";

// Decision model identifiers
pub const FIELD_VARIABLE: &str = "variable";
pub const FIELD_PROJECT: &str = "project";
pub const FIELD_FORMAT: &str = "format";

// Batch sizes
pub const FIELD_CHANGE_COUNT: &str = "change_count";
pub const FIELD_SKIPPED_COUNT: &str = "skipped_count";

// Error fields
pub const FIELD_ERR_KIND: &str = "err_kind";
pub const FIELD_ERR_CODE: &str = "err_code";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";
