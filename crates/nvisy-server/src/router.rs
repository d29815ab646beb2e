//! Fan-out components: [`Router`] sends each job to exactly one of several
//! outputs chosen by a predicate, and [`ErrorRouter`] specializes that to
//! split failed jobs away from successful ones.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::component::{Receiver, Sender};
use crate::error::Error;
use crate::job::Job;

/// A predicate over a job that MUST NOT mutate it, used to pick a
/// [`Router`] output.
pub type Condition = Box<dyn Fn(&Job) -> bool + Send + Sync>;

/// Routes each job received on `input` to exactly one of `outputs`, chosen
/// by evaluating `conditions` **in order** and taking the first match; a
/// job matching none of them goes to `default`.
///
/// `outputs` and `conditions` must have the same length -- [`Router::spawn`]
/// panics immediately otherwise, per the structural-misconfiguration
/// failure mode: a router built wrong is a programmer error, not something
/// to route around at runtime.
///
/// Closes every entry in `outputs` once `input` closes. Never closes
/// `default` or `input`: `default` is typically the fan-in point for a
/// downstream [`crate::collector::Collector`] whose own closure is
/// orchestrated elsewhere, so the router can't assume it's the sole writer.
pub struct Router {
    conditions: Vec<Condition>,
}

impl Router {
    /// Builds a router that evaluates `conditions` in order against every
    /// job it receives.
    pub fn new(conditions: Vec<Condition>) -> Self {
        Self { conditions }
    }

    /// Spawns the router wired to `input`, `outputs`, and `default`.
    ///
    /// # Panics
    ///
    /// Panics if `outputs.len() != conditions.len()`.
    pub fn spawn(self: Arc<Self>, input: Receiver, outputs: Vec<Sender>, default: Sender) -> JoinHandle<()> {
        assert_eq!(
            outputs.len(),
            self.conditions.len(),
            "Router: {} outputs but {} conditions",
            outputs.len(),
            self.conditions.len(),
        );

        tokio::spawn(async move {
            while let Ok(job) = input.recv().await {
                let matched = self.conditions.iter().position(|condition| condition(&job));
                let output = matched.and_then(|index| outputs.get(index)).unwrap_or(&default);
                if output.send(job).await.is_err() {
                    break;
                }
            }
            // `default` is deliberately left open: see the module docs.
            drop(outputs);
        })
    }
}

/// Splits jobs into a success output and an error output based on whether a
/// component upstream recorded an [`Error`] as the job's result.
///
/// Any component that fails sets the job's result to the error it hit
/// rather than forwarding to its normal output, and an `ErrorRouter`
/// downstream is what notices and reroutes those jobs to error-handling
/// components (typically an [`crate::error_passer::ErrorPasser`] or
/// [`crate::panic_handler::PanicHandler`]).
pub struct ErrorRouter;

impl ErrorRouter {
    /// Spawns the router wired to `input`, sending jobs whose result is an
    /// [`Error`] to `error_output` and everything else to `success_output`.
    pub fn spawn(input: Receiver, success_output: Sender, error_output: Sender) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Ok(job) = input.recv().await {
                let is_error = job.result_payload().is_some_and(|result| result.is::<Error>());
                let output = if is_error { &error_output } else { &success_output };
                if output.send(job).await.is_err() {
                    break;
                }
            }
        })
    }
}
