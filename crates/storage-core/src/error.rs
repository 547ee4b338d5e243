use std::io;

/// Errors shared by all storage backends.
///
/// Usage errors (`NotReadable`/`NotWritable`) and configuration errors are
/// raised synchronously and never swallowed. Remote errors are surfaced on
/// the strict channel (`try_*` methods, file-handle I/O) and converted to
/// sentinels only by [`best_effort`](crate::best_effort) on the `Storage`
/// trait surface.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A read was attempted on a handle not opened in read mode.
    #[error("file was not opened in read mode")]
    NotReadable,

    /// A write was attempted on a handle not opened in write mode.
    #[error("file was not opened in write mode")]
    NotWritable,

    /// A required configuration value is absent or empty.
    #[error("missing required setting: {0}")]
    MissingSetting(&'static str),

    /// Configuration was present but unusable.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Credential exchange with the remote identity provider failed.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The remote resource does not exist.
    #[error("resource not found: {0}")]
    NotFound(String),

    /// The remote service answered with a non-success status.
    #[error("remote service error (HTTP {status}): {detail}")]
    Remote { status: u16, detail: String },

    /// The request or its response never completed (connect, timeout,
    /// interrupted body).
    #[error("transport error: {0}")]
    Transport(String),

    /// Local spooled-buffer I/O failed.
    #[error("buffer I/O error: {0}")]
    Buffer(#[from] io::Error),
}

impl StorageError {
    /// True for errors produced by the remote service or the path to it,
    /// as opposed to local usage/configuration mistakes.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            StorageError::Auth(_)
                | StorageError::NotFound(_)
                | StorageError::Remote { .. }
                | StorageError::Transport(_)
        )
    }
}
