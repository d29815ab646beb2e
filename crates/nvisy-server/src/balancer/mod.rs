//! Load balancers: pools of identical workers sharing one input and one
//! output.
//!
//! Because every inter-component channel is MPMC
//! ([`async_channel::Sender`]/[`async_channel::Receiver`] support many
//! concurrent producers and consumers over the same queue), a pool of
//! workers that each hold a clone of the same input and output needs no
//! explicit distributor or merge step: [`async_channel`] hands each job to
//! whichever worker is next ready to receive, which is exactly what a
//! [`StaticLoadBalancer`] is. A [`DynamicLoadBalancer`] adds the ability to
//! resize that pool at runtime.

mod dynamic_balancer;
mod static_balancer;

pub use dynamic_balancer::DynamicLoadBalancer;
pub use static_balancer::StaticLoadBalancer;

use std::sync::Arc;

use crate::component::{Component, Receiver, Sender};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Spawns one clone of `worker` against shared `input`/`output` clones,
/// running until `input` closes -- the unit every balancer in this module
/// is built out of.
fn spawn_worker<C: Component>(worker: Arc<C>, input: Receiver, output: Sender) -> JoinHandle<()> {
    tokio::spawn(async move { worker.run(input, output).await })
}

/// Spawns one clone of `worker`, but stops pulling new jobs as soon as
/// `cancel` fires -- any job already checked out still runs to completion
/// and is forwarded before the task exits. This is the two-phase shutdown
/// a [`DynamicLoadBalancer`] uses to remove a worker without dropping
/// whatever it's holding: Phase A is "stop asking for more work", Phase B
/// is "finish what's already in hand and go".
fn spawn_cancellable_worker<C: Component>(
    worker: Arc<C>,
    input: Receiver,
    output: Sender,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let job = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                job = input.recv() => job,
            };
            let Ok(job) = job else { break };

            // Phase B: once a job is checked out, finish it regardless of
            // a cancellation that arrives mid-flight -- `worker.run` only
            // sees one job through a single-element channel round trip so
            // that a cancel can't interrupt it partway.
            let (once_tx, once_rx) = async_channel::bounded(1);
            let _ = once_tx.send(job).await;
            once_tx.close();
            worker.clone().run(once_rx, output.clone()).await;
        }
    })
}
