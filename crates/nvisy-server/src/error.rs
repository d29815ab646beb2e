//! Pipeline error types and utilities.
//!
//! This module provides comprehensive error handling for the pipeline library with:
//!
//! - Strongly-typed error kinds for different failure categories
//! - Builder pattern for ergonomic error construction
//! - Type-safe error source tracking with boxed trait objects
//! - Integration with `thiserror` for automatic `Display` and `Error` trait implementations
//! - An [`IntoResponse`] impl so components can hand an `Error` straight to axum

use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Type alias for boxed errors that are Send + Sync.
///
/// This is the standard error boxing type used throughout the pipeline
/// for error sources. Using a type alias ensures consistency and reduces
/// verbosity in error type signatures.
///
/// # Thread Safety
///
/// The `Send + Sync` bounds ensure errors can be safely transferred between
/// threads and shared across thread boundaries, which is essential for async
/// Rust where tasks may move between threads.
pub type BoxedError = Box<dyn StdError + Send + Sync>;

/// Result type alias for pipeline operations.
///
/// This is a convenience alias that uses [`Error`] as the error type,
/// reducing boilerplate in function signatures throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Error kind enumeration for categorizing pipeline errors.
///
/// This enum represents the different categories of errors that can occur
/// while jobs flow through the pipeline. It's separated from [`Error`] to
/// allow for pattern matching on error types without accessing the full error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Configuration-related errors.
    Config,
    /// External service communication errors.
    External,
    /// File system operation errors.
    FileSystem,
    /// Internal pipeline logic errors.
    Internal,
    /// A job's request or result payload did not hold the type a component expected.
    InputTypeMismatch,
    /// A worker task backing a load balancer or component terminated unexpectedly.
    WorkerCrashed,
    /// The session manager failed to mint a fresh Session-Id.
    SessionIdGeneration,
    /// The HTTP request/response layer rejected or failed to produce a response.
    InternalServerError,
}

impl ErrorKind {
    /// Returns the error kind as a string for categorization.
    ///
    /// Useful for metrics, logging, or error categorization.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Config => "config",
            Self::External => "external_service",
            Self::FileSystem => "file_system",
            Self::Internal => "internal_service",
            Self::InputTypeMismatch => "input_type_mismatch",
            Self::WorkerCrashed => "worker_crashed",
            Self::SessionIdGeneration => "session_id_generation",
            Self::InternalServerError => "internal_server_error",
        }
    }

    /// Maps this kind to the HTTP status code written when an `Error` reaches
    /// the response boundary without having been translated by a handler.
    #[must_use]
    pub const fn status_code(self) -> StatusCode {
        match self {
            Self::Config | Self::FileSystem => StatusCode::INTERNAL_SERVER_ERROR,
            Self::External => StatusCode::BAD_GATEWAY,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            Self::InputTypeMismatch => StatusCode::INTERNAL_SERVER_ERROR,
            Self::WorkerCrashed => StatusCode::INTERNAL_SERVER_ERROR,
            Self::SessionIdGeneration => StatusCode::INTERNAL_SERVER_ERROR,
            Self::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pipeline error with structured information.
///
/// This structure provides comprehensive error information including:
///
/// - Error kind for categorization
/// - Human-readable message
/// - Optional source error for error chaining
#[derive(Debug, thiserror::Error)]
#[error("{kind} error: {message}")]
pub struct Error {
    /// The error category/type
    kind: ErrorKind,
    /// Human-readable error message
    message: Cow<'static, str>,
    /// Optional underlying error that caused this error
    #[source]
    source: Option<BoxedError>,
}

impl Error {
    /// Creates a new [`Error`] of the given kind with no message set yet.
    ///
    /// Pair with [`Error::with_message`] for the builder style used by the
    /// recovery middleware, or use one of the named constructors below for
    /// the common cases.
    #[inline]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: Cow::Borrowed(""),
            source: None,
        }
    }

    /// Sets the human-readable message, replacing whatever was there.
    #[inline]
    #[must_use]
    pub fn with_message(mut self, message: impl Into<Cow<'static, str>>) -> Self {
        self.message = message.into();
        self
    }

    /// Appends additional context to the message.
    ///
    /// Unlike [`Error::with_source`], this does not require the context to
    /// implement [`StdError`] -- useful for attaching a plain string detail
    /// gathered at the point of failure (a panic payload, a rejection cause).
    #[inline]
    #[must_use]
    pub fn with_context(mut self, context: impl fmt::Display) -> Self {
        self.message = if self.message.is_empty() {
            Cow::Owned(context.to_string())
        } else {
            Cow::Owned(format!("{}: {}", self.message, context))
        };
        self
    }

    /// Attaches a source error to this error, enabling error chain tracking.
    ///
    /// This method consumes the error and returns a new one with the source attached.
    /// It follows the builder pattern for ergonomic error construction.
    #[inline]
    #[must_use]
    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Returns the error kind.
    #[must_use]
    #[inline]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the error message.
    #[must_use]
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Creates a new configuration error.
    #[inline]
    pub fn config(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Config).with_message(message)
    }

    /// Creates a new external service error.
    #[inline]
    pub fn external(
        service: impl Into<Cow<'static, str>>,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        let service_name = service.into();
        let msg = message.into();
        let full_message = format!("{service_name}: {msg}");
        Self::new(ErrorKind::External).with_message(full_message)
    }

    /// Creates a new file system error.
    #[inline]
    pub fn file_system(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::FileSystem).with_message(message)
    }

    /// Creates a new internal pipeline error.
    #[inline]
    pub fn internal(
        component: impl Into<Cow<'static, str>>,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        let component_name = component.into();
        let msg = message.into();
        let full_message = format!("{component_name}: {msg}");
        Self::new(ErrorKind::Internal).with_message(full_message)
    }

    /// Creates an error reporting that a job's payload did not hold the
    /// concrete type a component tried to downcast it to.
    #[inline]
    pub fn input_type_mismatch(component: impl Into<Cow<'static, str>>, expected: &str) -> Self {
        Self::new(ErrorKind::InputTypeMismatch)
            .with_message(format!("expected payload of type `{expected}`"))
            .with_context(component.into())
    }

    /// Creates an error reporting that a worker task behind a load balancer
    /// or other dispatching component has crashed.
    ///
    /// The message is always exactly `"Component crashed."`, matching the
    /// literal text a [`crate::panic_handler::PanicHandler`] puts in front
    /// of a client -- the panic's own payload is logged separately rather
    /// than folded into the message a caller might render verbatim.
    #[inline]
    pub fn worker_crashed() -> Self {
        Self::new(ErrorKind::WorkerCrashed).with_message("Component crashed.")
    }

    /// Creates an error reporting that the session manager could not mint a
    /// fresh Session-Id (the system RNG is exhausted or unavailable).
    #[inline]
    pub fn session_id_generation(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::SessionIdGeneration).with_message(message)
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.kind.status_code();
        let body = self.message.clone().into_owned();
        (status, body).into_response()
    }
}
