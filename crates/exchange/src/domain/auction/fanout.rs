use {crate::domain::Deadline, std::future::Future};

/// Why a future didn't produce an output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unfinished {
    /// The deadline passed first. The task was aborted.
    Deadline,
    /// The task panicked or was cancelled.
    Failed,
}

/// Runs every future as its own task until all finish or the deadline passes.
///
/// Results are in input order. Tasks still running at the deadline are
/// aborted. A task that blocks its thread therefore can't hold up the others
/// or the caller. Results of tasks that finished are always kept. The tasks
/// inherit the current request id.
pub async fn join_until<F>(
    deadline: Deadline,
    futures: impl IntoIterator<Item = F>,
) -> Vec<Result<F::Output, Unfinished>>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    let tasks = futures
        .into_iter()
        .map(::observe::request_id::spawn_task_with_current_request_id)
        .collect::<Vec<_>>();
    futures::future::join_all(tasks.into_iter().map(|mut task| async move {
        match tokio::time::timeout_at(deadline.instant(), &mut task).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(err)) => {
                tracing::error!(?err, "fan-out task failed");
                Err(Unfinished::Failed)
            }
            Err(_) => {
                task.abort();
                Err(Unfinished::Deadline)
            }
        }
    }))
    .await
}
