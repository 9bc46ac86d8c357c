//! External shutdown triggers feeding the pipeline's ShutdownSignal

use pointer_core::ShutdownSignal;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

pub const STOP_FILE_POLL: Duration = Duration::from_millis(100);

/// Poll for `path`; when it appears, remove it and request shutdown.
///
/// Returns once shutdown has been requested by anyone.
pub async fn watch_stop_file(path: PathBuf, shutdown: ShutdownSignal, poll: Duration) {
    while !shutdown.is_cancelled() {
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            if let Err(e) = tokio::fs::remove_file(&path).await {
                warn!("Failed to remove stop file {:?}: {}", path, e);
            }
            info!("Stop file {:?} found, shutting down", path);
            shutdown.cancel();
            return;
        }
        tokio::time::sleep(poll).await;
    }
}

/// Request shutdown on Ctrl-C
pub async fn watch_ctrl_c(shutdown: ShutdownSignal) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            info!("Ctrl-C received, shutting down");
            shutdown.cancel();
        }
        Err(e) => warn!("Failed to listen for Ctrl-C: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_stop_file_triggers_shutdown_and_is_removed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stop_pointer.txt");
        let shutdown = ShutdownSignal::new();

        let watcher = tokio::spawn(watch_stop_file(path.clone(), shutdown.clone(), Duration::from_millis(10)));
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(!shutdown.is_cancelled());

        std::fs::write(&path, "").unwrap();
        tokio::time::timeout(Duration::from_secs(2), watcher).await.unwrap().unwrap();

        assert!(shutdown.is_cancelled());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_watcher_exits_when_shutdown_elsewhere() {
        let dir = TempDir::new().unwrap();
        let shutdown = ShutdownSignal::new();
        let watcher = tokio::spawn(watch_stop_file(
            dir.path().join("never"),
            shutdown.clone(),
            Duration::from_millis(10),
        ));

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(2), watcher).await.unwrap().unwrap();
    }
}
