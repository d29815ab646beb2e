//! [`DynamicLoadBalancer`]: a worker pool that grows and shrinks while
//! running, driven entirely by how quickly jobs get handed off to a
//! worker.
//!
//! Unlike [`super::StaticLoadBalancer`], workers here don't share the
//! balancer's outer `input` directly -- they pull from a private
//! `toWorkers` rendezvous channel, and a single dispatcher task is the sole
//! reader of `input` and sole writer to `toWorkers`. That's what lets the
//! dispatcher observe "a job is waiting but no worker took it within
//! `add_timeout`" and "no job has arrived within `remove_timeout`", neither
//! of which is visible from outside an ordinary MPMC hand-off.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::spawn_cancellable_worker;
use crate::component::{Component, Receiver, Sender, channel};
use crate::job::Job;
use crate::utility::tracing_targets;

struct Worker {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

fn spawn_one<C: Component>(worker: Arc<C>, input: Receiver, output: Sender) -> Worker {
    let cancel = CancellationToken::new();
    let handle = spawn_cancellable_worker(worker, input, output, cancel.clone());
    Worker { cancel, handle }
}

/// A pool of workers that grows toward `max_workers` under sustained load
/// and shrinks back toward one when idle.
///
/// The dispatcher alternates two phases, keyed by whether a job is
/// currently checked out of `input` and not yet handed to a worker:
///
/// - **Phase A** (no job in hand): waits for the next job from `input`, or
///   for `remove_timeout` to elapse. On elapse, if more than one worker is
///   running, the most-recently-added one is shut down (LIFO) and the
///   phase repeats.
/// - **Phase B** (a job in hand): attempts to deliver it to the worker
///   pool via `toWorkers`, or waits `add_timeout`. On elapse, if the pool
///   is under `max_workers`, a new worker is spawned and delivery is
///   retried with the same job -- nothing is ever dropped while waiting
///   for capacity.
///
/// `1 <= pool_size() <= max_workers` holds at every observation point while
/// `input` is open; the pool never scales below one worker on its own.
pub struct DynamicLoadBalancer {
    pool_size: Arc<AtomicUsize>,
    dispatcher: JoinHandle<()>,
}

impl DynamicLoadBalancer {
    /// Spawns the dispatcher (and one initial worker), then runs the
    /// control loop described at the type level until `input` closes.
    ///
    /// # Panics
    ///
    /// Panics if `max_workers` is zero.
    pub fn spawn<C: Component>(
        worker: Arc<C>,
        max_workers: usize,
        add_timeout: Duration,
        remove_timeout: Duration,
        input: Receiver,
        output: Sender,
    ) -> Self {
        assert!(max_workers >= 1, "DynamicLoadBalancer: max_workers must be at least 1");

        let (to_workers_tx, to_workers_rx) = channel();
        let mut workers = vec![spawn_one(Arc::clone(&worker), to_workers_rx.clone(), output.clone())];

        let pool_size = Arc::new(AtomicUsize::new(workers.len()));
        let pool_size_for_loop = Arc::clone(&pool_size);

        let dispatcher = tokio::spawn(async move {
            let mut recorded: Option<Job> = None;

            'dispatch: loop {
                // Phase A: no job currently checked out.
                if recorded.is_none() {
                    loop {
                        tokio::select! {
                            biased;
                            job = input.recv() => {
                                match job {
                                    Ok(job) => { recorded = Some(job); break; }
                                    Err(_) => break 'dispatch,
                                }
                            }
                            () = tokio::time::sleep(remove_timeout) => {
                                if workers.len() > 1 {
                                    let removed = workers.pop().expect("just checked len > 1");
                                    removed.cancel.cancel();
                                    pool_size_for_loop.store(workers.len(), Ordering::SeqCst);
                                    debug!(
                                        target: tracing_targets::BALANCER,
                                        pool_size = workers.len(),
                                        "dynamic balancer removed an idle worker",
                                    );
                                }
                                // Still Phase A: keep waiting for the next job.
                            }
                        }
                    }
                }

                // Phase B: deliver the recorded job, scaling up if delivery
                // stalls. `send_fut` lives across loop iterations so a
                // timeout never drops (and loses) the job it's carrying.
                let job = recorded.take().expect("just ensured a job is recorded");
                let mut send_fut = Box::pin(to_workers_tx.send(job));
                loop {
                    tokio::select! {
                        biased;
                        result = &mut send_fut => {
                            if result.is_err() {
                                // Every worker has gone away; nothing left to deliver to.
                                break 'dispatch;
                            }
                            break;
                        }
                        () = tokio::time::sleep(add_timeout) => {
                            if workers.len() < max_workers {
                                workers.push(spawn_one(
                                    Arc::clone(&worker),
                                    to_workers_rx.clone(),
                                    output.clone(),
                                ));
                                pool_size_for_loop.store(workers.len(), Ordering::SeqCst);
                                debug!(
                                    target: tracing_targets::BALANCER,
                                    pool_size = workers.len(),
                                    "dynamic balancer added a worker under load",
                                );
                            }
                            // Remain in Phase B: the job is still undelivered.
                        }
                    }
                }
            }

            // `input` closed: dropping the only `toWorkers` sender closes
            // it for every worker, so each exits its next `recv` and the
            // pool drains without an explicit per-worker signal.
            drop(to_workers_tx);
            for worker in workers {
                let _ = worker.handle.await;
            }
        });

        Self { pool_size, dispatcher }
    }

    /// Returns the number of workers currently running.
    ///
    /// A momentary snapshot -- the dispatcher may add or remove a worker
    /// concurrently with the read.
    #[must_use]
    pub fn pool_size(&self) -> usize {
        self.pool_size.load(Ordering::SeqCst)
    }

    /// Awaits the dispatcher and every worker it spawned, returning once
    /// `input` has closed and the whole pool has drained.
    pub async fn join(self) {
        let _ = self.dispatcher.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::channel;

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

    struct Sleepy {
        duration: Duration,
    }

    #[async_trait::async_trait]
    impl Component for Sleepy {
        async fn run(self: Arc<Self>, input: Receiver, output: Sender) {
            while let Ok(mut job) = input.recv().await {
                tokio::time::sleep(self.duration).await;
                job.set_result(Box::new(()));
                if output.send(job).await.is_err() {
                    break;
                }
            }
        }
    }

    #[tokio::test]
    async fn starts_with_exactly_one_worker() {
        let (in_tx, in_rx) = channel();
        let (out_tx, out_rx) = channel();
        let balancer = DynamicLoadBalancer::spawn(
            Arc::new(Increment),
            4,
            Duration::from_millis(50),
            Duration::from_secs(60),
            in_rx,
            out_tx,
        );
        assert_eq!(balancer.pool_size(), 1);

        drop(in_tx);
        balancer.join().await;
        assert!(out_rx.recv().await.is_err());
    }

    #[tokio::test]
    async fn delivers_every_job_without_loss_or_duplication() {
        let (in_tx, in_rx) = channel();
        let (out_tx, out_rx) = channel();
        let balancer = DynamicLoadBalancer::spawn(
            Arc::new(Increment),
            4,
            Duration::from_millis(20),
            Duration::from_millis(200),
            in_rx,
            out_tx,
        );

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
    }

    #[tokio::test(start_paused = true)]
    async fn scales_up_under_sustained_load_and_back_down_when_idle() {
        let (in_tx, in_rx) = channel();
        let (out_tx, out_rx) = channel();
        let balancer = DynamicLoadBalancer::spawn(
            Arc::new(Sleepy { duration: Duration::from_secs(5) }),
            10,
            Duration::from_secs(1),
            Duration::from_secs(2),
            in_rx,
            out_tx,
        );

        for n in 0..3_u32 {
            let (job, _waiter) = Job::new(Box::new(n));
            in_tx.send(job).await.unwrap();
        }

        tokio::time::sleep(Duration::from_millis(3_100)).await;
        assert!(balancer.pool_size() >= 3, "pool_size = {}", balancer.pool_size());

        for _ in 0..3 {
            out_rx.recv().await.unwrap();
        }

        // Idle now; the pool should shrink back toward one worker.
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(balancer.pool_size(), 1);

        drop(in_tx);
        balancer.join().await;
    }

    #[tokio::test]
    async fn never_exceeds_max_workers() {
        let (in_tx, in_rx) = channel();
        let (out_tx, out_rx) = channel();
        let balancer = DynamicLoadBalancer::spawn(
            Arc::new(Sleepy { duration: Duration::from_millis(200) }),
            2,
            Duration::from_millis(10),
            Duration::from_millis(500),
            in_rx,
            out_tx,
        );

        for n in 0..5_u32 {
            let (job, _waiter) = Job::new(Box::new(n));
            in_tx.send(job).await.unwrap();
        }

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(balancer.pool_size() <= 2);

        for _ in 0..5 {
            out_rx.recv().await.unwrap();
        }

        drop(in_tx);
        balancer.join().await;
    }
}
