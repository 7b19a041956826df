//! Background task plumbing shared by registry and worker processes.

use axum::Router;
use std::future::Future;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::{AbortHandle, JoinHandle};

/// Spawn a long-running task whose panic is caught and logged at the task
/// boundary instead of propagating to the process.
pub fn spawn_supervised<F>(name: &'static str, task: F) -> JoinHandle<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    spawn_supervised_abortable(name, task).0
}

/// Like [`spawn_supervised`], also returning a handle that cancels the task
/// itself (aborting the returned `JoinHandle` only stops the watcher).
pub fn spawn_supervised_abortable<F>(name: &'static str, task: F) -> (JoinHandle<()>, AbortHandle)
where
    F: Future<Output = ()> + Send + 'static,
{
    let inner = tokio::spawn(task);
    let abort = inner.abort_handle();
    let watcher = tokio::spawn(async move {
        match inner.await {
            Ok(()) => tracing::debug!(task = name, "Background task finished"),
            Err(e) if e.is_panic() => {
                tracing::error!(task = name, error = %e, "Background task panicked")
            }
            Err(_) => tracing::info!(task = name, "Background task cancelled"),
        }
    });
    (watcher, abort)
}

/// Serve `router` on `listener` until the shutdown signal fires
pub async fn serve_until_shutdown(
    name: &'static str,
    listener: TcpListener,
    router: Router,
    mut shutdown: broadcast::Receiver<()>,
) {
    let addr = listener
        .local_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    tracing::info!(server = name, addr = %addr, "Listening");

    let result = axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
        })
        .await;

    match result {
        Ok(()) => tracing::info!(server = name, "Server stopped"),
        Err(e) => tracing::error!(server = name, error = %e, "Server error"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_panicking_task_is_contained() {
        let handle = spawn_supervised("boom", async {
            panic!("heartbeat exploded");
        });
        tokio_test::assert_ok!(handle.await);
    }

    #[tokio::test]
    async fn test_aborted_task_is_cancelled() {
        let (watcher, abort) = spawn_supervised_abortable("idle", async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        });
        abort.abort();

        let joined = tokio::time::timeout(Duration::from_secs(5), watcher).await;
        assert!(matches!(joined, Ok(Ok(()))));
    }

    #[tokio::test]
    async fn test_server_stops_on_shutdown() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let (tx, rx) = broadcast::channel(1);
        let handle = tokio::spawn(serve_until_shutdown("test", listener, Router::new(), rx));

        tx.send(()).unwrap();
        let joined = tokio::time::timeout(Duration::from_secs(5), handle).await;
        assert!(matches!(joined, Ok(Ok(()))));
    }
}
