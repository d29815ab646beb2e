//! [`PanicHandler`]: wraps a [`JobProcessor`] so that a panic while handling
//! one job doesn't take the whole component down, and distinguishes a crash
//! that happened *while processing a specific job* from one that didn't.
//!
//! # The idle/busy distinction
//!
//! A panic is caught with [`futures::FutureExt::catch_unwind`] scoped
//! tightly around the call to [`JobProcessor::process`] -- nothing else in
//! the loop is wrapped. That means:
//!
//! - **Busy**: the panic happened while a specific job was checked out for
//!   processing. The handler still owns that job (it was only borrowed by
//!   the panicking future, never moved into it), so it can record the
//!   panic as the job's result and forward it downstream -- typically to
//!   an [`crate::router::ErrorRouter`] and then an
//!   [`crate::error_passer::ErrorPasser`] -- instead of losing it.
//! - **Idle**: anything that goes wrong outside of `process` (a bug in the
//!   receive/forward plumbing itself) is not caught here and takes the
//!   whole `run` task down, visible to whoever spawned it as a failed
//!   [`tokio::task::JoinHandle`]. There's no job to blame for a crash that
//!   happens between jobs, so the right response is letting a supervisor
//!   (a load balancer, typically) notice the task died and restart it.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::error;

use crate::component::{Component, Receiver, Sender};
use crate::error::Error;
use crate::job::Job;
use crate::utility::tracing_targets;

/// Per-job processing logic a [`PanicHandler`] supervises.
#[async_trait::async_trait]
pub trait JobProcessor: Send + Sync + 'static {
    /// Processes `job` in place (setting its result, response code, or
    /// writing through its response writer). May panic; [`PanicHandler`]
    /// catches it.
    async fn process(&self, job: &mut Job);
}

/// Wraps a [`JobProcessor`], catching any panic it raises while handling a
/// job and turning it into that job's error result instead of losing the
/// job or taking the component down.
pub struct PanicHandler<P> {
    inner: Arc<P>,
}

impl<P: JobProcessor> PanicHandler<P> {
    /// Wraps `inner` as a [`Component`].
    pub fn new(inner: Arc<P>) -> Self {
        Self { inner }
    }
}

#[async_trait::async_trait]
impl<P: JobProcessor> Component for PanicHandler<P> {
    async fn run(self: Arc<Self>, input: Receiver, output: Sender) {
        while let Ok(mut job) = input.recv().await {
            let inner = Arc::clone(&self.inner);
            let outcome = AssertUnwindSafe(async { inner.process(&mut job).await })
                .catch_unwind()
                .await;

            if let Err(panic_payload) = outcome {
                let message = panic_message(&panic_payload);
                error!(
                    target: tracing_targets::PANIC_HANDLER,
                    panic = %message,
                    "component panicked while processing a job"
                );
                job.set_result(Box::new(Error::worker_crashed()));
            }

            if output.send(job).await.is_err() {
                break;
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_owned())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::component::{channel, make};
    use crate::error::Error;

    struct Doubler;

    #[async_trait::async_trait]
    impl JobProcessor for Doubler {
        async fn process(&self, job: &mut Job) {
            let value = *job.request::<u32>().unwrap();
            job.set_result(Box::new(value * 2));
        }
    }

    struct AlwaysPanics;

    #[async_trait::async_trait]
    impl JobProcessor for AlwaysPanics {
        async fn process(&self, _job: &mut Job) {
            panic!("synthetic failure");
        }
    }

    #[tokio::test]
    async fn forwards_successful_jobs_unchanged() {
        let (in_tx, in_rx) = channel();
        let (out_tx, out_rx) = channel();
        let handle = make(Arc::new(PanicHandler::new(Arc::new(Doubler))), in_rx, out_tx);

        let (job, _waiter) = Job::new(Box::new(21_u32));
        in_tx.send(job).await.unwrap();
        let forwarded = out_rx.recv().await.unwrap();
        assert_eq!(*forwarded.result::<u32>().unwrap(), 42);

        drop(in_tx);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn catches_a_panic_and_forwards_the_job_with_an_error_result() {
        let (in_tx, in_rx) = channel();
        let (out_tx, out_rx) = channel();
        let handle = make(Arc::new(PanicHandler::new(Arc::new(AlwaysPanics))), in_rx, out_tx);

        let (job, _waiter) = Job::new(Box::new(1_u32));
        in_tx.send(job).await.unwrap();
        let mut forwarded = out_rx.recv().await.unwrap();
        let error = forwarded.take_result::<Error>().expect("expected an error result");
        assert_eq!(error.kind(), crate::error::ErrorKind::WorkerCrashed);
        assert_eq!(error.message(), "Component crashed.");

        drop(in_tx);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn one_panicking_job_does_not_stop_the_handler_from_processing_the_next() {
        let (in_tx, in_rx) = channel();
        let (out_tx, out_rx) = channel();
        let handle = make(Arc::new(PanicHandler::new(Arc::new(AlwaysPanics))), in_rx, out_tx);

        let (job_a, _wa) = Job::new(Box::new(1_u32));
        let (job_b, _wb) = Job::new(Box::new(2_u32));
        in_tx.send(job_a).await.unwrap();
        in_tx.send(job_b).await.unwrap();

        for _ in 0..2 {
            let mut job = out_rx.recv().await.unwrap();
            assert!(job.take_result::<Error>().is_some());
        }

        drop(in_tx);
        handle.await.unwrap();
    }
}
