//! Per-run cancellation and blocking-task tracking.

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::error::{BuildError, Result};

/// Cancellation and blocking work belonging to one run.
///
/// File work is spawned through [`RunScope::spawn_blocking`]. A blocking task
/// keeps running when the future awaiting it is dropped, so the run waits on
/// [`RunScope::settle`] before giving up its slot, and the task itself stops
/// between files once [`RunScope::token`] is cancelled.
#[derive(Debug, Clone, Default)]
pub struct RunScope {
    token: CancellationToken,
    tasks: TaskTracker,
}

impl RunScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Run `work` on the blocking pool, handing it this scope's token.
    pub async fn spawn_blocking<T, F>(&self, work: F) -> Result<T>
    where
        F: FnOnce(CancellationToken) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let token = self.token.clone();
        self.tasks
            .spawn_blocking(move || work(token))
            .await
            .map_err(|e| BuildError::Io(std::io::Error::other(e)))?
    }

    /// Wait for every blocking task spawned so far. No task may be spawned
    /// afterwards.
    pub async fn settle(&self) {
        self.tasks.close();
        self.tasks.wait().await;
    }
}

/// `Err(Cancelled)` once `token` fired; checked between files.
pub(crate) fn ensure_not_cancelled(token: &CancellationToken) -> Result<()> {
    if token.is_cancelled() {
        Err(BuildError::Cancelled)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn settle_waits_for_tasks_whose_future_was_dropped() {
        let scope = RunScope::new();
        let done = Arc::new(AtomicBool::new(false));

        let task = {
            let done = done.clone();
            scope.spawn_blocking(move |_| {
                std::thread::sleep(Duration::from_millis(100));
                done.store(true, Ordering::SeqCst);
                Ok(())
            })
        };
        // Poll once so the task is spawned, then abandon it.
        let _ = tokio::time::timeout(Duration::from_millis(1), task).await;

        scope.settle().await;
        assert!(done.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn work_sees_the_cancelled_token() {
        let scope = RunScope::new();
        scope.token().cancel();

        let result = scope.spawn_blocking(|token| ensure_not_cancelled(&token)).await;
        assert!(matches!(result, Err(BuildError::Cancelled)));
    }
}
