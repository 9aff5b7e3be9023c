//! Spawns long-running listener loops and reports when one of them stops.

use crate::observability::events;
use std::future::Future;
use tokio::task::AbortHandle;
use tracing::{debug, error, warn};

const COMPONENT: &str = "task_supervisor";

/// Handle to a supervised task. Dropping it does not stop the task.
#[derive(Debug)]
pub(crate) struct SupervisedTask {
    task_name: String,
    abort_handle: AbortHandle,
}

impl SupervisedTask {
    pub(crate) fn task_name(&self) -> &str {
        &self.task_name
    }

    /// Requests cancellation. The task stops at its next suspension point.
    pub(crate) fn abort(&self) {
        self.abort_handle.abort();
    }
}

/// Spawns `future` on the current runtime plus a watcher that logs the way it ended.
///
/// Listener loops are expected to run for the process lifetime, so a normal return is
/// reported as a warning and a panic as an error.
pub(crate) fn spawn_supervised<F>(task_name: impl Into<String>, future: F) -> SupervisedTask
where
    F: Future<Output = ()> + Send + 'static,
{
    let task_name = task_name.into();
    debug!(
        event = events::TASK_SPAWN,
        component = COMPONENT,
        task_name = task_name.as_str(),
        "spawning supervised task"
    );

    let join_handle = tokio::spawn(future);
    let abort_handle = join_handle.abort_handle();

    let watched_name = task_name.clone();
    tokio::spawn(async move {
        match join_handle.await {
            Ok(()) => warn!(
                event = events::TASK_EXIT,
                component = COMPONENT,
                task_name = watched_name.as_str(),
                "supervised task returned"
            ),
            Err(err) if err.is_cancelled() => debug!(
                event = events::TASK_EXIT,
                component = COMPONENT,
                task_name = watched_name.as_str(),
                "supervised task cancelled"
            ),
            Err(err) => error!(
                event = events::TASK_PANIC,
                component = COMPONENT,
                task_name = watched_name.as_str(),
                err = %err,
                "supervised task panicked"
            ),
        }
    });

    SupervisedTask {
        task_name,
        abort_handle,
    }
}
