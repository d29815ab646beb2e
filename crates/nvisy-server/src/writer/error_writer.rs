//! Renders a pipeline [`Error`] onto a [`Writer`], for
//! [`crate::writer::WriterStage`] to turn a job's error result into a
//! response without an axum `Request`/`Response` in scope.

use axum::http::{HeaderName, HeaderValue};

use super::Writer;
use crate::error::{Error, Result};

/// Writes an [`Error`] to `writer` as the job's final response: the error
/// kind's mapped status code, a `text/plain` body containing the message,
/// then closes the writer.
pub async fn write_error(writer: &(impl Writer + ?Sized), error: &Error) -> Result<()> {
    writer.set_status(error.kind().status_code()).await;
    writer
        .set_header(
            HeaderName::from_static("content-type"),
            HeaderValue::from_static("text/plain; charset=utf-8"),
        )
        .await;
    writer.write(error.message().to_owned().into_bytes().into()).await?;
    writer.close().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::writer::GenericWriter;

    #[tokio::test]
    async fn writes_status_and_message() {
        let sink = GenericWriter::new();
        let error = Error::new(ErrorKind::WorkerCrashed).with_message("Component crashed.");
        write_error(&sink, &error).await.unwrap();

        assert_eq!(sink.status(), error.kind().status_code());
        assert_eq!(sink.body(), bytes::Bytes::from_static(b"Component crashed."));
        assert!(sink.is_closed());
    }
}
