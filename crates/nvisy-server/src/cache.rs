//! [`CacheComponent`]: a best-effort response cache in front of a worker.
//!
//! Wraps a worker [`Component`] whose result is a (mostly) pure function of
//! the request. Cachable methods are fingerprinted (see
//! [`crate::job::RequestMeta::fingerprint`]) and looked up in [`Storage`]
//! before the worker runs at all; a hit skips the worker entirely.

use std::sync::Arc;
use std::time::Duration;

use axum::http::Method;
use jiff::Timestamp;
use tracing::debug;

use crate::component::{Component, Receiver, Sender, channel};
use crate::job::{Job, Payload, RequestMeta};
use crate::storage::{Storage, StorageValue};
use crate::utility::tracing_targets;

const CACHABLE_METHODS: [Method; 4] = [Method::GET, Method::HEAD, Method::POST, Method::PATCH];

/// Wraps a worker [`Component`], caching its result for cachable requests.
///
/// A job whose request payload isn't a [`RequestMeta`] (an internal job
/// under test, say) always bypasses the cache and runs the worker
/// directly, the same as a non-cachable method would.
///
/// No request coalescing: two concurrent misses for the same key may both
/// invoke the worker, with the second `Set` simply overwriting the first.
/// This is a deliberate simplification, not an oversight -- the cache is an
/// accelerator, not a correctness mechanism, and single-flight is left as
/// an extension a caller may layer on top.
pub struct CacheComponent<C> {
    worker: Arc<C>,
    storage: Arc<Storage>,
    expiration: Duration,
}

impl<C: Component> CacheComponent<C> {
    /// Wraps `worker`, caching hits in `storage` for `expiration`.
    pub fn new(worker: Arc<C>, storage: Arc<Storage>, expiration: Duration) -> Self {
        Self { worker, storage, expiration }
    }

    fn cache_key(job: &Job) -> Option<String> {
        let meta = job.request::<RequestMeta>().ok()?;
        CACHABLE_METHODS.contains(&meta.method).then(|| meta.fingerprint())
    }

    async fn run_worker(worker_in: &Sender, worker_out: &Receiver, job: Job) -> Option<Job> {
        if worker_in.send(job).await.is_err() {
            return None;
        }
        worker_out.recv().await.ok()
    }
}

#[async_trait::async_trait]
impl<C: Component> Component for CacheComponent<C> {
    async fn run(self: Arc<Self>, input: Receiver, output: Sender) {
        let (worker_in_tx, worker_in_rx) = channel();
        let (worker_out_tx, worker_out_rx) = channel();
        let worker_handle = crate::component::make(Arc::clone(&self.worker), worker_in_rx, worker_out_tx);

        while let Ok(job) = input.recv().await {
            let Some(key) = Self::cache_key(&job) else {
                let Some(job) = Self::run_worker(&worker_in_tx, &worker_out_rx, job).await else { break };
                if output.send(job).await.is_err() {
                    break;
                }
                continue;
            };

            let now = Timestamp::now();
            if let Some(cached) = self.storage.get(&key)
                && !cached.is_expired(now)
            {
                debug!(target: tracing_targets::CACHE, key = %key, "cache hit");
                let mut job = job;
                if let Some(result) = cached.downcast_ref::<Payload>() {
                    job.set_result(clone_payload(result));
                }
                if output.send(job).await.is_err() {
                    break;
                }
                continue;
            }

            debug!(target: tracing_targets::CACHE, key = %key, "cache miss");
            let Some(job) = Self::run_worker(&worker_in_tx, &worker_out_rx, job).await else { break };
            if let Some(result) = job.result_payload() {
                let expires_at = now + self.expiration;
                self.storage.set(key, StorageValue::new(clone_payload(result), expires_at));
            }
            if output.send(job).await.is_err() {
                break;
            }
        }

        worker_in_tx.close();
        worker_handle.await.ok();
    }
}

/// Placeholder clone for an opaque result payload.
///
/// [`Payload`] (`Box<dyn Any + Send + Sync>`) has no generic way to clone
/// its contents; concrete result types workers in this crate actually
/// produce (strings, byte buffers) are enumerated here rather than trying
/// to clone arbitrary `dyn Any`.
fn clone_payload(payload: &Payload) -> Payload {
    if let Some(s) = payload.downcast_ref::<String>() {
        return Box::new(s.clone());
    }
    if let Some(b) = payload.downcast_ref::<bytes::Bytes>() {
        return Box::new(b.clone());
    }
    if let Some(v) = payload.downcast_ref::<Vec<u8>>() {
        return Box::new(v.clone());
    }
    Box::new(())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use axum::http::HeaderMap;

    use super::*;
    use crate::component::make;

    struct Counter {
        calls: AtomicU32,
    }

    #[async_trait::async_trait]
    impl Component for Counter {
        async fn run(self: Arc<Self>, input: Receiver, output: Sender) {
            while let Ok(mut job) = input.recv().await {
                let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
                job.set_result(Box::new(format!("A-{n}")));
                if output.send(job).await.is_err() {
                    break;
                }
            }
        }
    }

    fn request(method: Method, url: &str) -> RequestMeta {
        RequestMeta { method, uri: url.parse().unwrap(), headers: HeaderMap::new() }
    }

    #[tokio::test]
    async fn a_second_lookup_before_expiry_is_a_cache_hit() {
        let storage = Arc::new(Storage::new());
        let worker = Arc::new(Counter { calls: AtomicU32::new(0) });
        let cache = Arc::new(CacheComponent::new(worker, storage, Duration::from_secs(60)));

        let (in_tx, in_rx) = channel();
        let (out_tx, out_rx) = channel();
        let handle = make(cache, in_rx, out_tx);

        let (job_a, _wa) = Job::new(Box::new(request(Method::GET, "/x")));
        in_tx.send(job_a).await.unwrap();
        let first = out_rx.recv().await.unwrap().result::<String>().unwrap().clone();

        let (job_b, _wb) = Job::new(Box::new(request(Method::GET, "/x")));
        in_tx.send(job_b).await.unwrap();
        let second = out_rx.recv().await.unwrap().result::<String>().unwrap().clone();

        assert_eq!(first, second);

        drop(in_tx);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn expiry_forces_a_second_worker_invocation() {
        let storage = Arc::new(Storage::new());
        let worker = Arc::new(Counter { calls: AtomicU32::new(0) });
        let cache = Arc::new(CacheComponent::new(worker, storage, Duration::ZERO));

        let (in_tx, in_rx) = channel();
        let (out_tx, out_rx) = channel();
        let handle = make(cache, in_rx, out_tx);

        let (job_a, _wa) = Job::new(Box::new(request(Method::GET, "/x")));
        in_tx.send(job_a).await.unwrap();
        let first = out_rx.recv().await.unwrap().result::<String>().unwrap().clone();

        tokio::time::sleep(Duration::from_millis(5)).await;

        let (job_b, _wb) = Job::new(Box::new(request(Method::GET, "/x")));
        in_tx.send(job_b).await.unwrap();
        let second = out_rx.recv().await.unwrap().result::<String>().unwrap().clone();

        assert_ne!(first, second);

        drop(in_tx);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn a_non_cachable_method_always_invokes_the_worker() {
        let storage = Arc::new(Storage::new());
        let worker = Arc::new(Counter { calls: AtomicU32::new(0) });
        let cache = Arc::new(CacheComponent::new(worker, storage, Duration::from_secs(60)));

        let (in_tx, in_rx) = channel();
        let (out_tx, out_rx) = channel();
        let handle = make(cache, in_rx, out_tx);

        let (job_a, _wa) = Job::new(Box::new(request(Method::DELETE, "/x")));
        in_tx.send(job_a).await.unwrap();
        let first = out_rx.recv().await.unwrap().result::<String>().unwrap().clone();

        let (job_b, _wb) = Job::new(Box::new(request(Method::DELETE, "/x")));
        in_tx.send(job_b).await.unwrap();
        let second = out_rx.recv().await.unwrap().result::<String>().unwrap().clone();

        assert_ne!(first, second);

        drop(in_tx);
        handle.await.unwrap();
    }
}
