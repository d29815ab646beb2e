//! A [`Writer`] that gzip-compresses everything written to it before
//! forwarding the compressed bytes (and a `Content-Encoding: gzip` header)
//! to an inner writer.
//!
//! Unlike `tower_http::compression::CompressionLayer`, which compresses the
//! already-formed HTTP response stream at the edge of the router, this
//! writer lets a pipeline component opt a single job's body into
//! compression before it ever reaches the HTTP layer -- useful for a
//! [`crate::cache::CacheComponent`] that wants to store pre-compressed
//! bodies.

use std::io::Write as _;
use std::sync::Mutex;

use axum::http::{HeaderName, HeaderValue, StatusCode};
use bytes::{Bytes, BytesMut};
use flate2::Compression;
use flate2::write::GzEncoder;

use super::Writer;
use crate::error::{Error, Result};

/// Wraps an inner [`Writer`], buffering writes and compressing the whole
/// body with gzip on [`Writer::close`].
pub struct GzipWriter<W: Writer> {
    inner: W,
    buffer: Mutex<BytesMut>,
}

impl<W: Writer> GzipWriter<W> {
    /// Wraps `inner`, which receives the compressed body.
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            buffer: Mutex::new(BytesMut::new()),
        }
    }
}

#[async_trait::async_trait]
impl<W: Writer> Writer for GzipWriter<W> {
    async fn set_status(&self, status: StatusCode) {
        self.inner.set_status(status).await;
    }

    async fn set_header(&self, name: HeaderName, value: HeaderValue) {
        self.inner.set_header(name, value).await;
    }

    async fn write(&self, bytes: Bytes) -> Result<()> {
        self.buffer.lock().expect("gzip writer lock poisoned").extend_from_slice(&bytes);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let plain = std::mem::take(&mut *self.buffer.lock().expect("gzip writer lock poisoned"));

        let mut encoder = GzEncoder::new(Vec::with_capacity(plain.len()), Compression::default());
        encoder
            .write_all(&plain)
            .map_err(|err| Error::internal("GzipWriter", err.to_string()))?;
        let compressed = encoder
            .finish()
            .map_err(|err| Error::internal("GzipWriter", err.to_string()))?;

        self.inner
            .set_header(
                HeaderName::from_static("content-encoding"),
                HeaderValue::from_static("gzip"),
            )
            .await;
        self.inner.write(compressed.into()).await?;
        self.inner.close().await
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read as _;

    use flate2::read::GzDecoder;

    use super::*;
    use crate::writer::GenericWriter;

    #[tokio::test]
    async fn compresses_on_close() {
        let sink = GenericWriter::new();
        let writer = GzipWriter::new(&sink);
        writer.write(Bytes::from_static(b"hello hello hello")).await.unwrap();
        writer.close().await.unwrap();

        assert_eq!(sink.headers().get("content-encoding").unwrap(), "gzip");

        let compressed = sink.body();
        let mut decoder = GzDecoder::new(&compressed[..]);
        let mut decompressed = String::new();
        decoder.read_to_string(&mut decompressed).unwrap();
        assert_eq!(decompressed, "hello hello hello");
    }
}
