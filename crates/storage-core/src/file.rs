use std::io::SeekFrom;

use async_trait::async_trait;

use crate::error::StorageError;

/// Mode a storage file handle was opened in.
///
/// Both modes materialize any existing remote content on first access.
/// Read handles start at the beginning and reject writes; write handles
/// start at the end, so new bytes append, and reject reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpenMode {
    /// Existing content is fetched lazily; the handle is read-only.
    #[default]
    Read,
    /// The cursor starts after any existing content; the buffer is
    /// persisted on close.
    Write,
}

impl OpenMode {
    pub fn is_read(self) -> bool {
        matches!(self, OpenMode::Read)
    }

    pub fn is_write(self) -> bool {
        matches!(self, OpenMode::Write)
    }
}

/// A buffered handle to one remote file.
///
/// Implementations keep content in a local buffer and defer remote traffic:
/// nothing is fetched until the first access, and nothing is persisted
/// until [`close`](StorageFile::close) on a modified write handle. A handle
/// that is opened and closed untouched performs no remote I/O.
#[async_trait]
pub trait StorageFile: Send {
    /// Name the handle was opened with.
    fn name(&self) -> &str;

    /// Mode the handle was opened in.
    fn mode(&self) -> OpenMode;

    /// Reads up to `buf.len()` bytes from the current position.
    ///
    /// Returns the number of bytes read; zero means end of content.
    /// Fails with [`StorageError::NotReadable`] on write-mode handles.
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Reads from the current position to the end of the content.
    async fn read_to_end(&mut self) -> Result<Vec<u8>, StorageError>;

    /// Writes `buf` at the current position and marks the handle dirty.
    ///
    /// Fails with [`StorageError::NotWritable`] on read-mode handles.
    async fn write(&mut self, buf: &[u8]) -> Result<usize, StorageError>;

    /// Moves the buffer cursor. Materializes content first on read handles
    /// so offsets resolve against the real length.
    async fn seek(&mut self, pos: SeekFrom) -> Result<u64, StorageError>;

    /// Length of the buffered content in bytes.
    async fn size(&mut self) -> Result<u64, StorageError>;

    /// Flushes pending changes (write handles only) and releases the buffer.
    ///
    /// Idempotent: closing an already-closed or never-touched handle is a
    /// no-op. The handle may be used again afterwards; the next access
    /// materializes a fresh buffer.
    async fn close(&mut self) -> Result<(), StorageError>;
}
