//! The HTTP boundary: turns an inbound axum request into a [`Job`] on a
//! pipeline's source channel, and blocks the connection open until some
//! writer downstream finishes it.
//!
//! Everything in [`crate::component`], [`crate::router`], [`crate::balancer`],
//! [`crate::cache`], and [`crate::session`] operates purely in terms of
//! [`Job`]s and never sees an axum `Request`/`Response` -- this module is the
//! only place that boundary is crossed in either direction. Reading the
//! request body is left to whichever component downstream actually needs
//! it; the core pipeline only ever carries `method`/`uri`/`headers`.

use std::sync::Arc;

use axum::Router;
use axum::extract::{Request, State};
use axum::http::HeaderValue;
use axum::response::Response;
use axum::routing::any;

use crate::component::Sender;
use crate::job::{Job, RequestMeta};
use crate::writer::{HttpResponseWriter, Writer};

const SERVER_HEADER_VALUE: HeaderValue = HeaderValue::from_static("mpserver");

/// Builds the axum handler for a single pipeline entry point: every request
/// it receives becomes a [`Job`] sent to `output`, and the handler's
/// response is released only once some writer downstream calls
/// [`Job::finish`].
///
/// If `output` is closed (the pipeline behind it has shut down), the
/// request fails fast with a 503 rather than hanging forever waiting for a
/// job nothing will ever pick up.
async fn handle(State(output): State<Sender>, request: Request) -> Response {
    let (parts, _body) = request.into_parts();
    let meta = RequestMeta { method: parts.method, uri: parts.uri, headers: parts.headers };

    let (response_writer, mut response) = HttpResponseWriter::new();
    let response_writer = Arc::new(response_writer);
    let job_writer: Arc<dyn Writer> = response_writer.clone();

    response.headers_mut().insert(axum::http::header::SERVER, SERVER_HEADER_VALUE);

    let (job, waiter) = Job::new(Box::new(meta));
    let job = job.with_response_writer(job_writer);

    if output.send(job).await.is_err() {
        *response.status_mut() = axum::http::StatusCode::SERVICE_UNAVAILABLE;
        return response;
    }

    waiter.wait().await;
    response_writer.apply_head(&mut response);
    response
}

/// Registers a pipeline entry point at `path` on `router`, sending every
/// request that arrives there to `output`.
///
/// Mirrors the original one-handler-per-URL registration, generalized to
/// axum's router-combinator style: call this once per pipeline source a
/// service exposes, then serve the resulting [`Router`] as usual.
#[must_use]
pub fn listen(router: Router, path: &str, output: Sender) -> Router {
    router.route(path, any(handle)).with_state(output)
}
