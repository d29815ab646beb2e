//! Observability middleware for monitoring and debugging.
//!
//! This module provides middleware for:
//! - Distributed tracing with request IDs
//! - Structured logging

mod ext;
mod request_id;
mod tracing;

pub use ext::RouterObservabilityExt;
pub use tracing::{
    create_propagate_request_id_layer, create_request_id_layer, create_sensitive_headers_layer,
    create_trace_layer,
};
