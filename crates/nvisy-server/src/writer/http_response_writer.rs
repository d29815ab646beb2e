//! Bridges a [`Writer`] to a live axum HTTP response by streaming written
//! chunks out over a channel as they arrive.
//!
//! This is what [`crate::listener`] hands to a job entering the pipeline
//! from the HTTP boundary: the listener task awaits the job's completion
//! signal while axum drains the other end of the channel into the client
//! connection, so a slow downstream component streams its result rather
//! than buffering the whole body in memory first.

use std::sync::Mutex;

use axum::body::Body;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::Response;
use bytes::Bytes;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use super::Writer;
use crate::error::Result;

/// Channel capacity for the body stream. One job in flight at a time keeps
/// memory bounded to a handful of chunks even under backpressure.
const CHANNEL_CAPACITY: usize = 16;

struct Head {
    status: StatusCode,
    headers: HeaderMap,
}

/// A [`Writer`] whose bytes are streamed straight into an axum response
/// body as they're written.
pub struct HttpResponseWriter {
    head: Mutex<Head>,
    body_tx: mpsc::Sender<std::result::Result<Bytes, std::io::Error>>,
}

impl HttpResponseWriter {
    /// Creates a writer and the [`Response`] it feeds.
    ///
    /// The returned response's status and headers reflect whatever
    /// [`Writer::set_status`]/[`Writer::set_header`] calls have landed by
    /// the time the response is actually sent -- callers should await the
    /// job's completion signal before handing the response back to axum.
    #[must_use]
    pub fn new() -> (Self, Response) {
        let (body_tx, body_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let body = Body::from_stream(ReceiverStream::new(body_rx));

        let writer = Self {
            head: Mutex::new(Head {
                status: StatusCode::OK,
                headers: HeaderMap::new(),
            }),
            body_tx,
        };
        let response = Response::new(body);
        (writer, response)
    }

    /// Applies the accumulated status and headers to `response`.
    ///
    /// Call this after the job finishes (its `done` signal fires) and
    /// before returning the response from the handler -- axum reads the
    /// response head eagerly, so mutating it after the body starts
    /// streaming would have no effect on what the client sees.
    pub fn apply_head(&self, response: &mut Response) {
        let head = self.head.lock().expect("response writer lock poisoned");
        *response.status_mut() = head.status;
        response.headers_mut().extend(head.headers.clone());
    }
}

#[async_trait::async_trait]
impl Writer for HttpResponseWriter {
    async fn set_status(&self, status: StatusCode) {
        self.head.lock().expect("response writer lock poisoned").status = status;
    }

    async fn set_header(&self, name: HeaderName, value: HeaderValue) {
        self.head
            .lock()
            .expect("response writer lock poisoned")
            .headers
            .insert(name, value);
    }

    async fn write(&self, bytes: Bytes) -> Result<()> {
        // The receiving end only goes away if the client disconnected;
        // there's nothing further to report to the component that wrote.
        let _ = self.body_tx.send(Ok(bytes)).await;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        // Dropping the sender closes the stream; tokio_stream::wrappers'
        // ReceiverStream ends as soon as every Sender clone is gone, which
        // here happens once this writer itself is dropped.
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;

    use super::*;

    #[tokio::test]
    async fn streams_written_chunks_into_the_body() {
        let (writer, mut response) = HttpResponseWriter::new();
        writer.set_status(StatusCode::CREATED).await;
        writer.write(Bytes::from_static(b"hello ")).await.unwrap();
        writer.write(Bytes::from_static(b"world")).await.unwrap();
        writer.close().await.unwrap();
        writer.apply_head(&mut response);
        drop(writer);

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body, Bytes::from_static(b"hello world"));
    }
}
