//! Offloading synchronous work from the async runtime

use docscore_core::{Error, Result};

/// Run `f` on the blocking thread pool.
///
/// Engine fits, predictions, and file I/O go through here so they never
/// stall request-serving tasks. The task keeps running if the caller's
/// future is dropped.
pub(crate) async fn run_blocking<F, T>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::internal(format!("blocking task failed: {}", e)))?
}
