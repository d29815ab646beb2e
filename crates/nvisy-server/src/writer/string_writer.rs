//! A [`Writer`] that assumes its body is UTF-8 text and exposes it as a
//! `String`, for demos and components that only ever produce plain text.

use std::sync::Mutex;

use axum::http::{HeaderName, HeaderValue, StatusCode};
use bytes::Bytes;

use super::Writer;
use crate::error::{Error, Result};

#[derive(Debug)]
struct Inner {
    status: StatusCode,
    body: String,
}

/// An in-memory text sink.
pub struct StringWriter {
    inner: Mutex<Inner>,
}

impl Default for StringWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl StringWriter {
    /// Creates an empty writer with a 200 status.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                status: StatusCode::OK,
                body: String::new(),
            }),
        }
    }

    /// Returns a snapshot of the text accumulated so far.
    #[must_use]
    pub fn text(&self) -> String {
        self.inner.lock().expect("string writer lock poisoned").body.clone()
    }

    /// Returns a snapshot of the status code written so far.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.inner.lock().expect("string writer lock poisoned").status
    }
}

#[async_trait::async_trait]
impl Writer for StringWriter {
    async fn set_status(&self, status: StatusCode) {
        self.inner.lock().expect("string writer lock poisoned").status = status;
    }

    async fn set_header(&self, _name: HeaderName, _value: HeaderValue) {
        // Plain text responses carry no headers worth tracking.
    }

    async fn write(&self, bytes: Bytes) -> Result<()> {
        let text = std::str::from_utf8(&bytes)
            .map_err(|_| Error::internal("StringWriter", "wrote non-UTF-8 bytes"))?;
        self.inner.lock().expect("string writer lock poisoned").body.push_str(text);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
