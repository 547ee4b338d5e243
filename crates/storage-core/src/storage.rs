use async_trait::async_trait;
use tracing::warn;

use crate::error::StorageError;
use crate::file::{OpenMode, StorageFile};

/// Backend-agnostic storage surface consumed by application code.
///
/// Remote failures never escape this trait: each operation degrades to a
/// well-known fallback value and logs the underlying error. Backends expose
/// a parallel strict surface (`try_*` methods) for callers that need to
/// distinguish failure modes.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Creates a handle on `name` without touching the remote service.
    ///
    /// All remote traffic is deferred to the handle's own operations.
    fn open(&self, name: &str, mode: OpenMode) -> Box<dyn StorageFile>;

    /// Whether `name` exists remotely. Falls back to `false`.
    async fn exists(&self, name: &str) -> bool;

    /// Size of `name` in bytes. Falls back to `-1`, also for missing files.
    async fn size(&self, name: &str) -> i64;

    /// Deletes `name` remotely. Failures are logged and dropped.
    async fn delete(&self, name: &str);

    /// Creates `path` and its ancestors. Each segment is attempted even when
    /// an earlier one fails.
    async fn create_dir(&self, path: &str);

    /// Persists `content` under `name`, creating parent directories first.
    ///
    /// Returns the cleaned name, whether or not the upload succeeded.
    async fn save(&self, name: &str, content: &[u8]) -> String;

    /// Public URL for `name`. Falls back to `name` itself.
    async fn url(&self, name: &str) -> String;
}

/// Converts a strict outcome into the trait's degraded surface: errors are
/// logged at `warn` and replaced by `fallback`.
pub fn best_effort<T>(
    op: &'static str,
    name: &str,
    outcome: Result<T, StorageError>,
    fallback: T,
) -> T {
    match outcome {
        Ok(value) => value,
        Err(err) => {
            warn!(op, name, error = %err, "storage operation failed, using fallback");
            fallback
        }
    }
}
