//! Helper for serializing a typed value as JSON through any [`Writer`].

use axum::http::{HeaderName, HeaderValue};
use serde::Serialize;

use super::Writer;
use crate::error::{Error, Result};

/// Wraps an inner [`Writer`] and serializes values to it as JSON.
///
/// This is a thin adapter rather than a `Writer` impl in its own right --
/// components that produce JSON call [`JsonWriter::write_value`] once they
/// have an owned value instead of fighting with a streaming serializer.
pub struct JsonWriter<'w, W: Writer + ?Sized> {
    inner: &'w W,
}

impl<'w, W: Writer + ?Sized> JsonWriter<'w, W> {
    /// Wraps `inner`, which receives the serialized bytes and the
    /// `application/json` content type.
    pub fn new(inner: &'w W) -> Self {
        Self { inner }
    }

    /// Serializes `value` and writes it through the inner writer, setting
    /// `Content-Type: application/json` first.
    pub async fn write_value(&self, value: &impl Serialize) -> Result<()> {
        let bytes =
            serde_json::to_vec(value).map_err(|err| Error::internal("JsonWriter", err.to_string()))?;

        self.inner
            .set_header(
                HeaderName::from_static("content-type"),
                HeaderValue::from_static("application/json"),
            )
            .await;
        self.inner.write(bytes.into()).await
    }
}
