//! The unit of work that flows through the pipeline.
//!
//! A [`Job`] carries an opaque, type-erased request payload in from the
//! boundary, accumulates a result as components process it, and exposes a
//! [`Writer`] capability so whichever component finishes it can hand bytes
//! straight to the original caller without routing the job back out the way
//! it came in. Every [`Job`] is paired with a [`JobWaiter`] at construction:
//! the creator (typically [`crate::listener`]) holds the waiter and awaits
//! it, while the job itself keeps moving through the pipeline.

use std::any::{Any, type_name};
use std::fmt;
use std::sync::Arc;

use axum::http::{HeaderMap, Method, StatusCode, Uri};
use tokio::sync::oneshot;

use crate::error::{Error, Result};
use crate::writer::Writer;

/// Type-erased payload carried by a [`Job`] as its request or result.
pub type Payload = Box<dyn Any + Send + Sync>;

/// The parts of an incoming HTTP request a [`Job`] carries as its
/// `request` payload -- everything [`crate::listener`] extracts before
/// handing the body off to whatever reads it downstream.
///
/// Kept separate from the request body deliberately: the body is read at
/// most once, by whichever component actually needs it, while `method`,
/// `uri`, and `headers` are immutable and read by any number of stages
/// (most notably [`crate::cache::CacheComponent`]'s fingerprinting).
#[derive(Debug, Clone)]
pub struct RequestMeta {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
}

impl RequestMeta {
    /// Builds the deterministic cache key for this request: `method ∥ url
    /// ∥ "HEADERS:" ∥ concat(name ∥ ":" ∥ values ∥ ";")` for every header.
    ///
    /// Header names are sorted before concatenation so that two logically
    /// identical requests fingerprint identically regardless of the order
    /// `HeaderMap` happens to iterate them in (see the open question on
    /// cache-key canonicalization).
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let mut names: Vec<_> = self.headers.keys().collect();
        names.sort_by_key(|name| name.as_str());

        let mut fingerprint = format!("{}{}HEADERS:", self.method, self.uri);
        for name in names {
            let values = self
                .headers
                .get_all(name)
                .iter()
                .filter_map(|value| value.to_str().ok())
                .collect::<String>();
            fingerprint.push_str(name.as_str());
            fingerprint.push(':');
            fingerprint.push_str(&values);
            fingerprint.push(';');
        }
        fingerprint
    }
}

/// A single piece of work flowing through the pipeline.
///
/// Components read [`Job::request`] (or an upstream [`Job::result`]),
/// produce their own typed output via [`Job::set_result`], and forward the
/// job onward. Only a terminal component calls [`Job::finish`], after first
/// writing through [`Job::response_writer`] if one is attached.
pub struct Job {
    request: Payload,
    result: Option<Payload>,
    response_code: StatusCode,
    response_headers: HeaderMap,
    response_writer: Option<Arc<dyn Writer>>,
    done: Option<oneshot::Sender<()>>,
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("response_code", &self.response_code)
            .field("has_result", &self.result.is_some())
            .field("has_response_writer", &self.response_writer.is_some())
            .finish_non_exhaustive()
    }
}

impl Job {
    /// Creates a new job carrying `request`, returning it alongside the
    /// [`JobWaiter`] its creator should hold on to.
    #[must_use]
    pub fn new(request: Payload) -> (Self, JobWaiter) {
        let (done_tx, done_rx) = oneshot::channel();
        let job = Self {
            request,
            result: None,
            response_code: StatusCode::OK,
            response_headers: HeaderMap::new(),
            response_writer: None,
            done: Some(done_tx),
        };
        (job, JobWaiter(done_rx))
    }

    /// Attaches a response writer capability, consuming and returning self
    /// for chaining at construction time.
    #[must_use]
    pub fn with_response_writer(mut self, writer: Arc<dyn Writer>) -> Self {
        self.response_writer = Some(writer);
        self
    }

    /// Returns the request payload's concrete type, or
    /// [`crate::error::ErrorKind::InputTypeMismatch`] if it doesn't hold a `T`.
    pub fn request<T: 'static>(&self) -> Result<&T> {
        self.request
            .downcast_ref::<T>()
            .ok_or_else(|| Error::input_type_mismatch("Job::request", type_name::<T>()))
    }

    /// Returns the raw, still type-erased request payload.
    #[must_use]
    pub fn request_payload(&self) -> &Payload {
        &self.request
    }

    /// Returns a request header's value, if the request payload is a
    /// [`RequestMeta`] and carries `name`.
    ///
    /// A job whose request isn't a [`RequestMeta`] (built for a non-HTTP
    /// test, say) simply has no headers to read; this returns `None`
    /// rather than the [`InputTypeMismatch`](crate::error::ErrorKind::InputTypeMismatch)
    /// a direct [`Job::request`] call would.
    #[must_use]
    pub fn request_header(&self, name: &axum::http::HeaderName) -> Option<&str> {
        self.request.downcast_ref::<RequestMeta>()?.headers.get(name)?.to_str().ok()
    }

    /// Returns the most recently set result's concrete type, or
    /// [`crate::error::ErrorKind::InputTypeMismatch`] if it's absent or holds
    /// some other type.
    pub fn result<T: 'static>(&self) -> Result<&T> {
        self.result
            .as_ref()
            .and_then(|result| result.downcast_ref::<T>())
            .ok_or_else(|| Error::input_type_mismatch("Job::result", type_name::<T>()))
    }

    /// Returns the raw, still type-erased result payload, if any component
    /// has produced one yet.
    #[must_use]
    pub fn result_payload(&self) -> Option<&Payload> {
        self.result.as_ref()
    }

    /// Overwrites the job's result, discarding whatever a previous
    /// component produced.
    pub fn set_result(&mut self, result: Payload) {
        self.result = Some(result);
    }

    /// Takes ownership of the result if it holds a `T`, leaving the job
    /// without a result. If the result holds some other type (or is
    /// absent), leaves it in place and returns `None`.
    ///
    /// Used by components that need to consume an owned value -- an
    /// [`crate::error::Error`] isn't [`Clone`], so
    /// [`crate::writer::WriterStage`] needs this rather than
    /// [`Job::result`] to render it and move on.
    pub fn take_result<T: 'static>(&mut self) -> Option<T> {
        match self.result.take() {
            Some(boxed) => match boxed.downcast::<T>() {
                Ok(value) => Some(*value),
                Err(boxed) => {
                    self.result = Some(boxed);
                    None
                }
            },
            None => None,
        }
    }

    /// Returns the response status code set so far (defaults to 200 OK).
    #[must_use]
    pub fn response_code(&self) -> StatusCode {
        self.response_code
    }

    /// Sets the response status code.
    pub fn set_response_code(&mut self, code: StatusCode) {
        self.response_code = code;
    }

    /// Sets a response header to be applied by whichever writer finishes
    /// this job -- used by stages like [`crate::session::SessionManager`]
    /// that need to set a header (`Session-Id`) without being the terminal
    /// writer themselves.
    pub fn set_response_header(&mut self, name: axum::http::HeaderName, value: axum::http::HeaderValue) {
        self.response_headers.insert(name, value);
    }

    /// Returns a previously set response header, if any.
    #[must_use]
    pub fn response_header(&self, name: &axum::http::HeaderName) -> Option<&axum::http::HeaderValue> {
        self.response_headers.get(name)
    }

    /// Returns every response header set so far, for a writer to apply
    /// before writing status and body.
    #[must_use]
    pub fn response_headers(&self) -> &HeaderMap {
        &self.response_headers
    }

    /// Overwrites a request header in place, if the request payload is a
    /// [`RequestMeta`]. Used by tests that need to simulate an incoming
    /// header without constructing a full HTTP request.
    pub fn set_request_header(&mut self, name: axum::http::HeaderName, value: axum::http::HeaderValue) {
        if let Some(meta) = self.request.downcast_mut::<RequestMeta>() {
            meta.headers.insert(name, value);
        }
    }

    /// Returns the job's response writer capability, if one is attached.
    ///
    /// A job created without a writer (an internal, fire-and-forget job, or
    /// one under test) simply has nothing to write its result to.
    #[must_use]
    pub fn response_writer(&self) -> Option<&Arc<dyn Writer>> {
        self.response_writer.as_ref()
    }

    /// Signals that this job is finished: whatever's waiting via the
    /// paired [`JobWaiter`] wakes up.
    ///
    /// Idempotent -- only the first call has any effect, matching the
    /// single-shot `done` semantics components rely on: every component
    /// that forwards a job unmodified forwards ownership of this signal too,
    /// so it would be a bug for two different components to both believe
    /// they're the one that gets to call it, but calling it twice by
    /// accident must not panic.
    pub fn finish(&mut self) {
        if let Some(done) = self.done.take() {
            let _ = done.send(());
        }
    }
}

/// Held by whoever created a [`Job`], to be notified once some component
/// downstream calls [`Job::finish`] on it.
#[must_use = "a JobWaiter that is never awaited leaves its caller unaware the job ever finished"]
pub struct JobWaiter(oneshot::Receiver<()>);

impl JobWaiter {
    /// Waits for the paired job to finish.
    ///
    /// Resolves even if the job (and its `done` sender) was dropped without
    /// an explicit [`Job::finish`] call -- a crashed or misbehaving
    /// component must not be able to hang the waiter forever.
    pub async fn wait(self) {
        let _ = self.0.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_downcasts_to_the_stored_type() {
        let (job, _waiter) = Job::new(Box::new(42_u32));
        assert_eq!(*job.request::<u32>().unwrap(), 42);
        assert!(job.request::<String>().is_err());
    }

    #[test]
    fn fingerprint_is_stable_regardless_of_header_insertion_order() {
        let mut headers_a = HeaderMap::new();
        headers_a.insert("x-b", "2".parse().unwrap());
        headers_a.insert("x-a", "1".parse().unwrap());

        let mut headers_b = HeaderMap::new();
        headers_b.insert("x-a", "1".parse().unwrap());
        headers_b.insert("x-b", "2".parse().unwrap());

        let a = RequestMeta { method: Method::GET, uri: "/x".parse().unwrap(), headers: headers_a };
        let b = RequestMeta { method: Method::GET, uri: "/x".parse().unwrap(), headers: headers_b };
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn fingerprint_differs_for_different_methods() {
        let get = RequestMeta { method: Method::GET, uri: "/x".parse().unwrap(), headers: HeaderMap::new() };
        let post = RequestMeta { method: Method::POST, uri: "/x".parse().unwrap(), headers: HeaderMap::new() };
        assert_ne!(get.fingerprint(), post.fingerprint());
    }

    #[test]
    fn result_starts_absent() {
        let (job, _waiter) = Job::new(Box::new(()));
        assert!(job.result_payload().is_none());
        assert!(job.result::<()>().is_err());
    }

    #[test]
    fn set_result_overwrites_and_downcasts() {
        let (mut job, _waiter) = Job::new(Box::new(()));
        job.set_result(Box::new("first".to_string()));
        job.set_result(Box::new("second".to_string()));
        assert_eq!(job.result::<String>().unwrap(), "second");
    }

    #[tokio::test]
    async fn finish_wakes_the_waiter_exactly_once() {
        let (mut job, waiter) = Job::new(Box::new(()));
        job.finish();
        job.finish(); // must not panic
        waiter.wait().await;
    }

    #[tokio::test]
    async fn dropping_the_job_without_finishing_still_resolves_the_waiter() {
        let (job, waiter) = Job::new(Box::new(()));
        drop(job);
        waiter.wait().await;
    }
}
