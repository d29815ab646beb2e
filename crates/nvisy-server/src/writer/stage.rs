//! [`WriterStage`]: the terminal "Writer" shape from the component design --
//! one input, no output, terminating by returning once input closes.
//!
//! Every other writer in this module (`StringWriter`, `GenericWriter`,
//! `GzipWriter`, ...) is a capability a [`Job`] carries; `WriterStage` is
//! what actually drains a channel of jobs and drives that capability,
//! dispatching on the concrete type of each job's result.

use bytes::Bytes;
use tokio::task::JoinHandle;

use super::{write_error, Writer};
use crate::component::Receiver;
use crate::error::Error;
use crate::job::Job;

/// Renders each job's result through its attached response writer and
/// finishes the job, then drains the next one.
///
/// A job with no response writer attached (an internal job under test) is
/// simply finished without attempting to write anywhere -- there's nowhere
/// to write to.
pub struct WriterStage;

impl WriterStage {
    /// Spawns the stage, draining `input` until it closes.
    #[must_use]
    pub fn spawn(input: Receiver) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Ok(mut job) = input.recv().await {
                Self::render(&mut job).await;
                job.finish();
            }
        })
    }

    async fn render(job: &mut Job) {
        let Some(writer) = job.response_writer().cloned() else {
            return;
        };

        if let Some(err) = job.take_result::<Error>() {
            job.set_response_code(err.kind().status_code());
            if let Err(write_err) = write_error(writer.as_ref(), &err).await {
                tracing::error!(
                    target: crate::utility::tracing_targets::WRITER,
                    %write_err,
                    "writer stage failed to render an error result"
                );
            }
            return;
        }

        let body = if let Ok(text) = job.result::<String>() {
            Some(Bytes::from(text.clone().into_bytes()))
        } else if let Ok(bytes) = job.result::<Bytes>() {
            Some(bytes.clone())
        } else if let Ok(bytes) = job.result::<Vec<u8>>() {
            Some(Bytes::from(bytes.clone()))
        } else {
            None
        };

        let Some(body) = body else {
            let err = Error::input_type_mismatch("WriterStage", "String, Bytes, or Vec<u8>");
            job.set_response_code(err.kind().status_code());
            let _ = write_error(writer.as_ref(), &err).await;
            return;
        };

        writer.set_status(job.response_code()).await;
        for (name, value) in job.response_headers() {
            writer.set_header(name.clone(), value.clone()).await;
        }
        if writer.write(body).await.is_ok() {
            let _ = writer.close().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::StatusCode;

    use super::*;
    use crate::component::channel;
    use crate::writer::GenericWriter;

    #[tokio::test]
    async fn writes_a_string_result_and_finishes_the_job() {
        let (in_tx, in_rx) = channel();
        let handle = WriterStage::spawn(in_rx);

        let sink = Arc::new(GenericWriter::new());
        let (job, waiter) = Job::new(Box::new(()));
        let mut job = job.with_response_writer(sink.clone() as Arc<dyn Writer>);
        job.set_result(Box::new("Hello world!".to_string()));

        in_tx.send(job).await.unwrap();
        waiter.wait().await;

        assert_eq!(sink.status(), StatusCode::OK);
        assert_eq!(sink.body(), bytes::Bytes::from_static(b"Hello world!"));
        assert!(sink.is_closed());

        drop(in_tx);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn a_type_mismatch_renders_a_500_diagnostic() {
        let (in_tx, in_rx) = channel();
        let handle = WriterStage::spawn(in_rx);

        let sink = Arc::new(GenericWriter::new());
        let (job, waiter) = Job::new(Box::new(()));
        let mut job = job.with_response_writer(sink.clone() as Arc<dyn Writer>);
        job.set_result(Box::new(42_u32));

        in_tx.send(job).await.unwrap();
        waiter.wait().await;

        assert_eq!(sink.status(), StatusCode::INTERNAL_SERVER_ERROR);

        drop(in_tx);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn a_job_without_a_writer_is_simply_finished() {
        let (in_tx, in_rx) = channel();
        let handle = WriterStage::spawn(in_rx);

        let (mut job, waiter) = Job::new(Box::new(()));
        job.set_result(Box::new("orphaned".to_string()));
        in_tx.send(job).await.unwrap();
        waiter.wait().await;

        drop(in_tx);
        handle.await.unwrap();
    }
}
