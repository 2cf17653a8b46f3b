//! Associates one identifier with a task so that all logs emitted while
//! handling a request can be tied together.
//!
//! The identifier lives in task local storage. It is globally visible but
//! individual to each task, so it doesn't have to be dragged through the code
//! base. When a request is forwarded to another process the current
//! identifier can be fetched and sent along.
use {
    axum::{extract::Request, middleware::Next, response::Response},
    std::{
        future::Future,
        sync::atomic::{AtomicUsize, Ordering},
    },
    tokio::task::JoinHandle,
    tracing::Instrument,
};

tokio::task_local! {
    pub static REQUEST_ID: String;
}

/// Header used to pass the request id between processes.
pub const HEADER: &str = "X-Request-ID";

/// Tries to read the `request_id` from this task's storage.
/// Returns `None` if task local storage was not initialized or is empty.
pub fn get_task_local_storage() -> Option<String> {
    REQUEST_ID.try_with(Clone::clone).ok()
}

/// Sets the tasks's local id to the passed in value for the given scope.
pub async fn set_task_local_storage<F, R>(id: String, scope: F) -> R
where
    F: Future<Output = R>,
{
    REQUEST_ID.scope(id, scope).await
}

/// Spawns a new task and ensures it uses the same request id as the current
/// task (if present). This allows for tracing requests across task boundaries.
pub fn spawn_task_with_current_request_id<F>(future: F) -> JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    if let Some(id) = get_task_local_storage() {
        tokio::task::spawn(set_task_local_storage(id, future))
    } else {
        tokio::task::spawn(future)
    }
}

/// Axum middleware that initializes task local storage with a request id
/// before handling the request.
/// The id is taken from the request's `X-Request-ID` header or, if that is
/// missing, a process wide request counter.
///
/// Install with `axum::middleware::from_fn(observe::request_id::middleware)`.
pub async fn middleware(request: Request, next: Next) -> Response {
    static COUNTER: AtomicUsize = AtomicUsize::new(0);

    let id = match request.headers().get(HEADER) {
        Some(header) => String::from_utf8_lossy(header.as_bytes()).to_string(),
        None => COUNTER.fetch_add(1, Ordering::SeqCst).to_string(),
    };
    let span = tracing::info_span!("request", id);
    set_task_local_storage(id, next.run(request).instrument(span)).await
}
