//! Detached background work
//!
//! Spawns a unit of work whose outcome nobody awaits. Failures are only
//! reported to the log, so the spawning path never depends on completion.

use std::future::Future;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Spawn `work` on the runtime and log its outcome under `label`
///
/// The returned handle may be dropped; it exists so tests can wait for the
/// work to finish.
pub fn spawn_detached<F>(label: &'static str, work: F) -> JoinHandle<()>
where
    F: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    tokio::spawn(async move {
        match work.await {
            Ok(()) => debug!(task = label, "Detached task completed"),
            Err(e) => warn!(task = label, error = %e, "Detached task failed"),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[tokio::test]
    async fn test_detached_task_runs() {
        let ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran);

        spawn_detached("flag", async move {
            flag.store(true, Ordering::SeqCst);
            Ok(())
        })
        .await
        .unwrap();

        assert!(ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_detached_failure_is_contained() {
        let handle = spawn_detached("failing", async { anyhow::bail!("write refused") });
        assert!(handle.await.is_ok());
    }
}
