//! Output sinks that a [`crate::job::Job`] writes its result through.
//!
//! [`Writer`] is the crate's analogue of Go's `http.ResponseWriter`: a small
//! capability object a job carries so that whichever component ends up
//! producing the final bytes doesn't need a reference back to the HTTP
//! connection itself. Components that only transform or route jobs never
//! touch a [`Writer`]; only terminal components (an HTTP listener's
//! implicit writer, a [`crate::cache::CacheComponent`] hit, a test harness)
//! construct one.

mod error_writer;
mod generic_writer;
mod gzip_writer;
mod http_response_writer;
mod json_writer;
mod stage;
mod string_writer;

pub use error_writer::write_error;
pub use generic_writer::GenericWriter;
pub use gzip_writer::GzipWriter;
pub use http_response_writer::HttpResponseWriter;
pub use json_writer::JsonWriter;
pub use stage::WriterStage;
pub use string_writer::StringWriter;

use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue, StatusCode};
use bytes::Bytes;

use crate::error::Result;

/// Capability to write a status, headers, and a body out to wherever a job's
/// response ultimately goes.
///
/// Implementations must tolerate being written to from whichever task ends
/// up finishing the job -- a [`Writer`] may cross component boundaries, so
/// every method takes `&self` rather than `&mut self`.
#[async_trait::async_trait]
pub trait Writer: Send + Sync {
    /// Sets the status code for the eventual response. Calling this more
    /// than once overwrites the previous value; the last call before
    /// [`Writer::close`] wins.
    async fn set_status(&self, status: StatusCode);

    /// Sets or overwrites a response header.
    async fn set_header(&self, name: HeaderName, value: HeaderValue);

    /// Appends a chunk of body bytes.
    async fn write(&self, bytes: Bytes) -> Result<()>;

    /// Signals that no more bytes are coming. Implementations that buffer
    /// (gzip, in particular) must flush any trailer here.
    async fn close(&self) -> Result<()>;
}

#[async_trait::async_trait]
impl Writer for Arc<dyn Writer> {
    async fn set_status(&self, status: StatusCode) {
        (**self).set_status(status).await;
    }

    async fn set_header(&self, name: HeaderName, value: HeaderValue) {
        (**self).set_header(name, value).await;
    }

    async fn write(&self, bytes: Bytes) -> Result<()> {
        (**self).write(bytes).await
    }

    async fn close(&self) -> Result<()> {
        (**self).close().await
    }
}

#[async_trait::async_trait]
impl<T: Writer + ?Sized> Writer for &T {
    async fn set_status(&self, status: StatusCode) {
        (**self).set_status(status).await;
    }

    async fn set_header(&self, name: HeaderName, value: HeaderValue) {
        (**self).set_header(name, value).await;
    }

    async fn write(&self, bytes: Bytes) -> Result<()> {
        (**self).write(bytes).await
    }

    async fn close(&self) -> Result<()> {
        (**self).close().await
    }
}
