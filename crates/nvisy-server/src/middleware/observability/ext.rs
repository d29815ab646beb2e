//! Combining extension trait for the observability layer stack.

use axum::Router;

use super::tracing::{
    create_propagate_request_id_layer, create_request_id_layer, create_sensitive_headers_layer,
    create_trace_layer,
};

/// Extension trait for `axum::`[`Router`] to apply the observability stack.
///
/// Installs a request-id layer, HTTP trace logging, sensitive-header
/// redaction, and request-id propagation back onto the response, in the
/// order that keeps every later layer and handler instrumented.
pub trait RouterObservabilityExt<S> {
    /// Layers the full observability stack onto the router.
    fn with_observability(self) -> Self;
}

impl<S> RouterObservabilityExt<S> for Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_observability(self) -> Self {
        self.layer(create_propagate_request_id_layer())
            .layer(create_trace_layer())
            .layer(create_sensitive_headers_layer())
            .layer(create_request_id_layer())
    }
}
