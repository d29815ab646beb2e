//! Centralized tracing target constants for structured logging.
//!
//! This module defines all tracing target strings used throughout the crate,
//! providing a single source of truth for log categorization and filtering.
//! Using consistent targets enables fine-grained control over log output
//! via tracing subscriber filters.

/// Error recovery including middleware errors and request failures.
pub const RECOVERY_ERROR: &str = "nvisy_server::recovery::error";

/// Panic recovery including handler panics and service failures.
pub const RECOVERY_PANIC: &str = "nvisy_server::recovery::panic";

/// Component routing and fan-out/fan-in bookkeeping.
pub const ROUTER: &str = "nvisy_server::router";

/// Load balancer worker pool management.
pub const BALANCER: &str = "nvisy_server::balancer";

/// Panic handling for pipeline components.
pub const PANIC_HANDLER: &str = "nvisy_server::panic_handler";

/// Response caching.
pub const CACHE: &str = "nvisy_server::cache";

/// Session management and Session-Id issuance.
pub const SESSION: &str = "nvisy_server::session";

/// Backing storage and expired-entry cleanup.
pub const STORAGE: &str = "nvisy_server::storage";

/// Terminal writer stages rendering a job's result to its response writer.
pub const WRITER: &str = "nvisy_server::writer";
