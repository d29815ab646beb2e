//! [`SessionManager`]: per-request state-machine advancement keyed by a
//! `Session-Id` header.

use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderName, HeaderValue};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jiff::Timestamp;
use rand::RngCore;
use tracing::{debug, warn};

use crate::component::{Component, Receiver, Sender};
use crate::error::{Error, Result};
use crate::job::Job;
use crate::storage::{Storage, StorageValue};
use crate::utility::tracing_targets;

/// Header carrying a session's id, in both directions.
pub static SESSION_ID_HEADER: HeaderName = HeaderName::from_static("session-id");

/// One step of a session's state machine.
///
/// States are immutable: [`State::next`] returns a new state rather than
/// mutating `self`, which is what lets [`SessionManager`] store a state by
/// value and compare the old and new ones freely.
#[async_trait::async_trait]
pub trait State: Send + Sync + 'static {
    /// Advances the state machine for `job`, returning the next state.
    async fn next(&self, job: &Job) -> Result<Box<dyn State>>;

    /// Whether this state is terminal: a terminal state is never persisted
    /// and the next request for the same id starts a fresh session.
    fn is_terminal(&self) -> bool;

    /// The opaque result this state contributes to the job.
    fn result(&self) -> crate::job::Payload;
}

/// Advances a [`State`] machine per request, keyed by the `Session-Id`
/// request header.
///
/// `session_expiration` of [`Duration::ZERO`] means sessions never expire
/// once created (matching the `≤ 0` case in the governing state-machine
/// description: a zero or negative expiration disables expiry entirely).
pub struct SessionManager<I> {
    storage: Arc<Storage>,
    initial: Arc<I>,
    session_expiration: Option<Duration>,
}

impl<I: State> SessionManager<I> {
    /// Builds a manager over `storage`, starting every fresh session from
    /// `initial`. `session_expiration` of `None` means sessions never
    /// expire.
    pub fn new(storage: Arc<Storage>, initial: Arc<I>, session_expiration: Option<Duration>) -> Self {
        Self { storage, initial, session_expiration }
    }

    fn generate_session_id() -> Result<String> {
        let mut bytes = [0_u8; 32];
        rand::rng().fill_bytes(&mut bytes);
        Ok(URL_SAFE_NO_PAD.encode(bytes))
    }

    fn expires_at(&self, now: Timestamp) -> Timestamp {
        match self.session_expiration {
            Some(duration) => now + duration,
            None => Timestamp::MAX,
        }
    }

    async fn start_new_session(&self, job: &mut Job, previous_id: Option<&str>) {
        if let Some(previous_id) = previous_id {
            self.storage.remove(previous_id);
        }

        let session_id = match Self::generate_session_id() {
            Ok(id) => id,
            Err(err) => {
                warn!(target: tracing_targets::SESSION, error = %err, "session id generation failed");
                job.set_result(Box::new(err));
                return;
            }
        };

        let state = match self.initial.next(job).await {
            Ok(state) => state,
            Err(err) => {
                job.set_result(Box::new(err));
                return;
            }
        };

        let now = Timestamp::now();
        let result = state.result();
        if !state.is_terminal() {
            self.storage.set(session_id.clone(), StorageValue::new(state, self.expires_at(now)));
        }

        job.set_response_header(SESSION_ID_HEADER.clone(), header_value(&session_id));
        job.set_result(result);
        debug!(target: tracing_targets::SESSION, session_id = %session_id, "started new session");
    }
}

#[async_trait::async_trait]
impl<I: State> Component for SessionManager<I> {
    async fn run(self: Arc<Self>, input: Receiver, output: Sender) {
        while let Ok(mut job) = input.recv().await {
            let session_id = job.request_header(&SESSION_ID_HEADER).map(ToOwned::to_owned);
            let stored = session_id.as_deref().and_then(|id| self.storage.get(id));

            match (session_id, stored) {
                (Some(id), Some(stored)) if !stored.is_expired(Timestamp::now()) => {
                    let Some(state) = stored.downcast_ref::<Box<dyn State>>() else {
                        job.set_result(Box::new(Error::internal("SessionManager", "stored session state corrupted")));
                        if output.send(job).await.is_err() {
                            break;
                        }
                        continue;
                    };

                    let next = match state.next(&job).await {
                        Ok(next) => next,
                        Err(err) => {
                            job.set_result(Box::new(err));
                            if output.send(job).await.is_err() {
                                break;
                            }
                            continue;
                        }
                    };

                    let result = next.result();
                    if next.is_terminal() {
                        self.storage.remove(&id);
                        debug!(target: tracing_targets::SESSION, session_id = %id, "session reached terminal state");
                    } else {
                        let now = Timestamp::now();
                        self.storage.set(id.clone(), StorageValue::new(next, self.expires_at(now)));
                    }

                    job.set_response_header(SESSION_ID_HEADER.clone(), header_value(&id));
                    job.set_result(result);
                }
                (id, _) => {
                    self.start_new_session(&mut job, id.as_deref()).await;
                }
            }

            if output.send(job).await.is_err() {
                break;
            }
        }
    }
}

fn header_value(session_id: &str) -> HeaderValue {
    HeaderValue::from_str(session_id).unwrap_or_else(|_| HeaderValue::from_static("invalid-session-id"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{channel, make};

    struct CountingState {
        count: u32,
    }

    #[async_trait::async_trait]
    impl State for CountingState {
        async fn next(&self, _job: &Job) -> Result<Box<dyn State>> {
            Ok(Box::new(CountingState { count: self.count + 1 }))
        }

        fn is_terminal(&self) -> bool {
            self.count >= 3
        }

        fn result(&self) -> crate::job::Payload {
            Box::new(self.count)
        }
    }

    fn empty_request() -> crate::job::RequestMeta {
        crate::job::RequestMeta {
            method: axum::http::Method::GET,
            uri: "/x".parse().unwrap(),
            headers: axum::http::HeaderMap::new(),
        }
    }

    #[tokio::test]
    async fn a_fresh_request_starts_a_new_session() {
        let storage = Arc::new(Storage::new());
        let manager = Arc::new(SessionManager::new(storage, Arc::new(CountingState { count: 0 }), None));
        let (in_tx, in_rx) = channel();
        let (out_tx, out_rx) = channel();
        let handle = make(manager, in_rx, out_tx);

        let (job, _waiter) = Job::new(Box::new(empty_request()));
        in_tx.send(job).await.unwrap();
        let forwarded = out_rx.recv().await.unwrap();
        assert!(forwarded.response_header(&SESSION_ID_HEADER).is_some());
        assert_eq!(*forwarded.result::<u32>().unwrap(), 1);

        drop(in_tx);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn the_fourth_request_after_a_terminal_state_starts_a_fresh_session() {
        let storage = Arc::new(Storage::new());
        let manager = Arc::new(SessionManager::new(Arc::clone(&storage), Arc::new(CountingState { count: 0 }), None));
        let (in_tx, in_rx) = channel();
        let (out_tx, out_rx) = channel();
        let handle = make(manager, in_rx, out_tx);

        let mut session_id: Option<HeaderValue> = None;
        for _ in 0..3 {
            let mut job = Job::new(Box::new(empty_request())).0;
            if let Some(id) = &session_id {
                job.set_request_header(SESSION_ID_HEADER.clone(), id.clone());
            }
            in_tx.send(job).await.unwrap();
            let forwarded = out_rx.recv().await.unwrap();
            session_id = forwarded.response_header(&SESSION_ID_HEADER).cloned();
        }
        assert!(storage.is_empty());

        let mut job = Job::new(Box::new(empty_request())).0;
        job.set_request_header(SESSION_ID_HEADER.clone(), session_id.unwrap());
        in_tx.send(job).await.unwrap();
        let forwarded = out_rx.recv().await.unwrap();
        assert_eq!(*forwarded.result::<u32>().unwrap(), 1);

        drop(in_tx);
        handle.await.unwrap();
    }
}
