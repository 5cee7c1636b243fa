// Tests module

//! Unit tests for controller plumbing that integration tests cannot reach

#[cfg(test)]
mod tests {
    use super::super::controller::{ScopedTask, StartHandle, StartOutcome};
    use crate::SessionError;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_ready_handle_resolves_immediately() {
        let handle = StartHandle::Ready(StartOutcome::Skipped);
        assert!(handle.is_finished());
        assert_eq!(handle.wait().await, StartOutcome::Skipped);
    }

    #[tokio::test]
    async fn test_running_handle_returns_task_outcome() {
        let handle = StartHandle::Running(tokio::spawn(async {
            StartOutcome::Failed(SessionError::credential_fetch("HTTP 500"))
        }));
        assert!(matches!(
            handle.wait().await,
            StartOutcome::Failed(SessionError::CredentialFetch { .. })
        ));
    }

    #[tokio::test]
    async fn test_aborted_handle_counts_as_discarded() {
        let task = tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            StartOutcome::Connected
        });
        task.abort();
        assert_eq!(StartHandle::Running(task).wait().await, StartOutcome::Discarded);
    }

    #[tokio::test]
    async fn test_scoped_task_aborts_on_drop() {
        let finished = Arc::new(AtomicBool::new(false));
        let flag = finished.clone();
        let task = ScopedTask::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            flag.store(true, Ordering::SeqCst);
        });

        drop(task);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!finished.load(Ordering::SeqCst), "dropped task must not run to completion");
    }
}
