//! The [`Component`] contract every pipeline stage implements, plus the
//! `Make`/`link`/`Constant` helpers used to wire components into a graph.
//!
//! Every inter-component edge is a capacity-1 [`async_channel`] channel
//! standing in for the design's unbuffered rendezvous: `async_channel`
//! refuses a literal `bounded(0)` (it panics with "capacity cannot be
//! zero"), so a send completes as soon as one slot is free rather than
//! only once a receiver is parked on the other end. In practice that slot
//! drains on the very next poll of a draining `run` loop, so no stage ever
//! observes more than one job queued ahead of the one it's about to
//! process -- close enough to true rendezvous for every ordering guarantee
//! this crate makes, without the panic a literal zero capacity would
//! cause. A component:
//!
//! - drains its input until the channel closes (every sender dropped),
//! - forwards or routes every job it receives -- no job is ever silently
//!   dropped,
//! - closes its own output only after its input has closed and every
//!   in-flight job has been forwarded,
//! - never closes an input channel it doesn't own (it isn't the only
//!   holder of the corresponding [`Sender`]).

use std::sync::Arc;

use async_channel::bounded;
use tokio::task::JoinHandle;

use crate::job::Job;

/// The sending half of a component-to-component link.
pub type Sender = async_channel::Sender<Job>;

/// The receiving half of a component-to-component link.
pub type Receiver = async_channel::Receiver<Job>;

/// Creates a fresh capacity-1 channel for linking two components -- the
/// crate's stand-in for a true zero-capacity rendezvous (see the module
/// docs for why `bounded(0)` itself can't be used).
#[must_use]
pub fn channel() -> (Sender, Receiver) {
    bounded(1)
}

/// A single stage in the pipeline graph.
///
/// Implementations own no channels themselves; `run` is handed its input
/// and output and must honor the contract described at the module level.
#[async_trait::async_trait]
pub trait Component: Send + Sync + 'static {
    /// Runs the component to completion: drains `input`, forwards to
    /// `output`, returns once `input` has closed and every job has been
    /// forwarded.
    async fn run(self: Arc<Self>, input: Receiver, output: Sender);
}

/// Spawns `component` as a background task wired to `input`/`output`.
///
/// This is the crate's `Make`-the-spawner: the thinnest possible bridge
/// from a [`Component`] impl to a running [`tokio::task`]. Not to be
/// confused with the [`Make`] component below, which lifts a plain
/// transform function into a [`Component`] in the first place -- `make`
/// here is what actually runs any `Component`, `Make` included.
pub fn make<C: Component>(component: Arc<C>, input: Receiver, output: Sender) -> JoinHandle<()> {
    tokio::spawn(async move { component.run(input, output).await })
}

/// Wires `stages` into one linear composite: `stages[0]` drains `input`,
/// each consecutive pair is joined by a fresh channel, and the last stage
/// writes to `output`.
///
/// Per §4.1's `Link(c1, …, cN)`: every stage but the last is spawned as
/// its own parallel task; the last ("the tail") runs inline in the task
/// this function itself spawns, so the composite -- the single
/// [`JoinHandle`] returned here -- only finishes once the tail has drained
/// its input and forwarded everything, not merely once the first stage
/// has been spawned. Closure propagates left-to-right automatically
/// through the [`Component`] contract: each stage closes its output only
/// after its own input closes, so the tail's input closing implies every
/// upstream stage has already finished.
///
/// # Panics
///
/// Panics if `stages` is empty.
pub fn link(stages: Vec<Arc<dyn Component>>, input: Receiver, output: Sender) -> JoinHandle<()> {
    assert!(!stages.is_empty(), "link: at least one stage is required");

    tokio::spawn(async move {
        let tail_index = stages.len() - 1;
        let mut handles = Vec::with_capacity(tail_index);
        let mut stage_input = input;

        let mut stages = stages.into_iter();
        for stage in stages.by_ref().take(tail_index) {
            let (tx, rx) = channel();
            handles.push(make(stage, stage_input, tx));
            stage_input = rx;
        }

        let tail = stages.next().expect("stages is non-empty");
        tail.run(stage_input, output).await;

        for handle in handles {
            let _ = handle.await;
        }
    })
}

/// Lifts a pure transform `f(job)` into a [`Component`] that applies it to
/// every job and forwards -- the crate's `Make(f)` from §4.1.
///
/// Panics from the transform propagate out of `run` like any other
/// component panic, to be caught by [`crate::panic_handler::PanicHandler`]
/// further up the graph.
pub struct Make<F> {
    transform: F,
}

impl<F> Make<F>
where
    F: Fn(&mut Job) + Send + Sync + 'static,
{
    /// Wraps `transform` as a [`Component`].
    pub fn new(transform: F) -> Self {
        Self { transform }
    }
}

#[async_trait::async_trait]
impl<F> Component for Make<F>
where
    F: Fn(&mut Job) + Send + Sync + 'static,
{
    async fn run(self: Arc<Self>, input: Receiver, output: Sender) {
        while let Ok(mut job) = input.recv().await {
            (self.transform)(&mut job);
            if output.send(job).await.is_err() {
                // Downstream closed its input; nothing more this stage can do.
                break;
            }
        }
    }
}

/// Sets every job's result to a clone of a fixed literal value and
/// forwards it -- the crate's `Constant(c)` from §4.1, used as a pipeline
/// source (e.g. `Constant::new("Hello world!".to_string())`).
pub struct Constant<C> {
    value: C,
}

impl<C> Constant<C>
where
    C: Clone + Send + Sync + 'static,
{
    /// Wraps the literal `value`, cloned into every job's result.
    pub fn new(value: C) -> Self {
        Self { value }
    }
}

#[async_trait::async_trait]
impl<C> Component for Constant<C>
where
    C: Clone + Send + Sync + 'static,
{
    async fn run(self: Arc<Self>, input: Receiver, output: Sender) {
        while let Ok(mut job) = input.recv().await {
            job.set_result(Box::new(self.value.clone()));
            if output.send(job).await.is_err() {
                break;
            }
        }
    }
}
