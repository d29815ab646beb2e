//! [`StaticLoadBalancer`]: a fixed-size pool of identical workers.

use std::sync::Arc;

use tokio::task::JoinHandle;

use super::spawn_worker;
use crate::component::{Component, Receiver, Sender};

/// A pool of `pool_size` clones of `worker`, all sharing `input` and
/// `output`.
///
/// The pool size never changes after construction; for a pool that can
/// grow or shrink while running, use [`super::DynamicLoadBalancer`].
pub struct StaticLoadBalancer {
    workers: Vec<JoinHandle<()>>,
}

impl StaticLoadBalancer {
    /// Spawns `pool_size` workers built from `worker`, sharing `input` and
    /// `output`.
    ///
    /// `output` is dropped once every worker's clone of it is, i.e. once
    /// every worker exits after `input` closes -- the balancer itself
    /// holds no channel ends of its own.
    pub fn spawn<C: Component>(
        worker: Arc<C>,
        pool_size: usize,
        input: Receiver,
        output: Sender,
    ) -> Self {
        let workers = (0..pool_size)
            .map(|_| spawn_worker(Arc::clone(&worker), input.clone(), output.clone()))
            .collect();
        Self { workers }
    }

    /// Returns the number of workers in the pool.
    #[must_use]
    pub fn pool_size(&self) -> usize {
        self.workers.len()
    }

    /// Awaits every worker in the pool, returning once the shared input has
    /// closed and all of them have drained it.
    pub async fn join(self) {
        for worker in self.workers {
            let _ = worker.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::channel;
    use crate::job::Job;

    struct Increment;

    #[async_trait::async_trait]
    impl Component for Increment {
        async fn run(self: Arc<Self>, input: Receiver, output: Sender) {
            while let Ok(mut job) = input.recv().await {
                let value = *job.request::<u32>().unwrap();
                job.set_result(Box::new(value + 1));
                if output.send(job).await.is_err() {
                    break;
                }
            }
        }
    }

    #[tokio::test]
    async fn distributes_jobs_across_the_pool() {
        let (in_tx, in_rx) = channel();
        let (out_tx, out_rx) = channel();
        let balancer = StaticLoadBalancer::spawn(Arc::new(Increment), 4, in_rx, out_tx);
        assert_eq!(balancer.pool_size(), 4);

        for n in 0..20_u32 {
            let (job, _waiter) = Job::new(Box::new(n));
            in_tx.send(job).await.unwrap();
        }

        let mut results = Vec::new();
        for _ in 0..20 {
            results.push(*out_rx.recv().await.unwrap().result::<u32>().unwrap());
        }
        results.sort_unstable();
        assert_eq!(results, (1..=20).collect::<Vec<_>>());

        drop(in_tx);
        balancer.join().await;
        assert!(out_rx.recv().await.is_err());
    }
}
