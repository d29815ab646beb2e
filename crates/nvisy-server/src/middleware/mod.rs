//! Middleware for the `axum::Router` that installs the HTTP boundary (see
//! [`crate::listener`]).
//!
//! This is the ambient HTTP-layer stack the boundary needs on top of the
//! pipeline itself: panic/timeout recovery and request tracing. Components
//! inside the pipeline never see an axum `Request`/`Response`, so nothing
//! pipeline-specific (routing, caching, sessions) lives here -- this module
//! only covers what wraps the handler axum actually dispatches to.
//!
//! # Layer ordering
//!
//! Axum applies layers in reverse order: the last one added wraps the
//! outermost request handling. From outermost to innermost:
//!
//! 1. **Recovery** - catches panics and enforces a request timeout, so
//!    every other layer and the handler itself run under a backstop.
//! 2. **Observability** - assigns a request id and emits a trace span
//!    early, so everything inside is instrumented.
//!
//! # Example
//!
//! ```rust
//! use axum::Router;
//! use nvisy_server::middleware::{RouterObservabilityExt, RouterRecoveryExt};
//!
//! fn create_router() -> Router {
//!     Router::new()
//!         .with_observability() // 2. Observability
//!         .with_default_recovery() // 1. Recovery (outermost)
//! }
//! ```

mod observability;
mod recovery;

pub use observability::RouterObservabilityExt;
pub use recovery::{RecoveryConfig, RouterRecoveryExt};
