//! [`ErrorPasser`]: wraps a worker [`Component`], routing jobs that already
//! carry an [`Error`] result straight to the output without invoking the
//! worker at all.
//!
//! The worker's output channel *is* the wrapper's output channel -- both a
//! bypassed error and one of the worker's own results land on the same
//! [`Sender`], so ordering between the two is not preserved. This sits
//! upstream of the worker it guards: a job that already failed earlier in
//! the graph shouldn't be handed to a worker that has no use for an error
//! it didn't produce.

use std::sync::Arc;

use crate::component::{Component, Receiver, Sender, channel, make};
use crate::error::Error;
use crate::job::Job;

/// Wraps a worker [`Component`], bypassing it for jobs that already carry
/// an [`Error`] result.
pub struct ErrorPasser<C> {
    worker: Arc<C>,
}

impl<C: Component> ErrorPasser<C> {
    /// Wraps `worker`.
    pub fn new(worker: Arc<C>) -> Self {
        Self { worker }
    }

    fn is_error(job: &Job) -> bool {
        job.result_payload().is_some_and(|result| result.is::<Error>())
    }
}

#[async_trait::async_trait]
impl<C: Component> Component for ErrorPasser<C> {
    async fn run(self: Arc<Self>, input: Receiver, output: Sender) {
        let (worker_in_tx, worker_in_rx) = channel();
        let worker_handle = make(Arc::clone(&self.worker), worker_in_rx, output.clone());

        while let Ok(job) = input.recv().await {
            if Self::is_error(&job) {
                if output.send(job).await.is_err() {
                    break;
                }
            } else if worker_in_tx.send(job).await.is_err() {
                break;
            }
        }

        worker_in_tx.close();
        worker_handle.await.ok();
    }
}
