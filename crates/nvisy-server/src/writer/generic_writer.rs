//! In-memory byte-buffer [`Writer`], the crate's default sink for tests and
//! for components (like [`crate::cache::CacheComponent`]) that need to
//! capture a response rather than stream it.

use std::sync::Mutex;

use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use bytes::{Bytes, BytesMut};

use super::Writer;
use crate::error::Result;

#[derive(Debug)]
struct Inner {
    status: StatusCode,
    headers: HeaderMap,
    body: BytesMut,
    closed: bool,
}

/// A [`Writer`] that accumulates everything written to it in memory.
///
/// Cloning the [`GenericWriter`] handle is cheap; every clone shares the
/// same underlying buffer via the inner lock.
pub struct GenericWriter {
    inner: Mutex<Inner>,
}

impl Default for GenericWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl GenericWriter {
    /// Creates an empty writer with a 200 status and no headers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                status: StatusCode::OK,
                headers: HeaderMap::new(),
                body: BytesMut::new(),
                closed: false,
            }),
        }
    }

    /// Returns a snapshot of the status code written so far.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.inner.lock().expect("generic writer lock poisoned").status
    }

    /// Returns a snapshot of the headers written so far.
    #[must_use]
    pub fn headers(&self) -> HeaderMap {
        self.inner
            .lock()
            .expect("generic writer lock poisoned")
            .headers
            .clone()
    }

    /// Returns a snapshot of the accumulated body.
    #[must_use]
    pub fn body(&self) -> Bytes {
        self.inner
            .lock()
            .expect("generic writer lock poisoned")
            .body
            .clone()
            .freeze()
    }

    /// Returns whether [`Writer::close`] has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.lock().expect("generic writer lock poisoned").closed
    }
}

#[async_trait::async_trait]
impl Writer for GenericWriter {
    async fn set_status(&self, status: StatusCode) {
        self.inner.lock().expect("generic writer lock poisoned").status = status;
    }

    async fn set_header(&self, name: HeaderName, value: HeaderValue) {
        self.inner
            .lock()
            .expect("generic writer lock poisoned")
            .headers
            .insert(name, value);
    }

    async fn write(&self, bytes: Bytes) -> Result<()> {
        self.inner
            .lock()
            .expect("generic writer lock poisoned")
            .body
            .extend_from_slice(&bytes);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.inner.lock().expect("generic writer lock poisoned").closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn accumulates_writes_in_order() {
        let writer = GenericWriter::new();
        writer.write(Bytes::from_static(b"hello ")).await.unwrap();
        writer.write(Bytes::from_static(b"world")).await.unwrap();
        writer.close().await.unwrap();

        assert_eq!(writer.body(), Bytes::from_static(b"hello world"));
        assert!(writer.is_closed());
    }

    #[tokio::test]
    async fn tracks_status_and_headers() {
        let writer = GenericWriter::new();
        writer.set_status(StatusCode::CREATED).await;
        writer
            .set_header(
                HeaderName::from_static("x-test"),
                HeaderValue::from_static("1"),
            )
            .await;

        assert_eq!(writer.status(), StatusCode::CREATED);
        assert_eq!(writer.headers().get("x-test").unwrap(), "1");
    }
}
