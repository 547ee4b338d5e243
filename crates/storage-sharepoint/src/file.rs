//! Buffered handle to one remote file.

use std::io::{Read, Seek, SeekFrom, Write};

use async_trait::async_trait;
use tempfile::SpooledTempFile;
use tracing::{debug, warn};

use storage_core::{OpenMode, StorageError, StorageFile};

use crate::storage::SharePointStorage;

/// A remote file buffered in a spooled temp file.
///
/// Construction performs no I/O. The buffer is materialized on first
/// content access: existing remote content is downloaded into it (and the
/// cursor rewound in read mode), a missing resource yields an empty buffer.
/// Writes only touch the buffer; `close()` flushes a dirty buffer through
/// the owning storage's save path and releases it. A closed handle is not
/// dead: the next access materializes a fresh buffer.
pub struct SharePointFile {
    name: String,
    mode: OpenMode,
    storage: SharePointStorage,
    buffer: Option<SpooledTempFile>,
    dirty: bool,
    content_type: Option<String>,
}

impl SharePointFile {
    pub fn new(name: &str, mode: OpenMode, storage: SharePointStorage) -> Self {
        let content_type = mime_guess::from_path(name)
            .first()
            .map(|mime| mime.to_string());
        Self {
            name: name.to_string(),
            mode,
            storage,
            buffer: None,
            dirty: false,
            content_type,
        }
    }

    /// Content type guessed from the file name, if any.
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    async fn ensure_materialized(&mut self) -> Result<&mut SpooledTempFile, StorageError> {
        match self.buffer {
            Some(ref mut buffer) => Ok(buffer),
            None => {
                let mut buffer = SpooledTempFile::new(self.storage.max_memory_size());
                if let Some(content) = self.storage.try_fetch(&self.name).await? {
                    debug!("materialized {} bytes for: {}", content.len(), self.name);
                    buffer.write_all(&content)?;
                    if self.mode.is_read() {
                        buffer.seek(SeekFrom::Start(0))?;
                    }
                } else {
                    debug!("materialized empty buffer for: {}", self.name);
                }
                Ok(self.buffer.insert(buffer))
            }
        }
    }
}

#[async_trait]
impl StorageFile for SharePointFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn mode(&self) -> OpenMode {
        self.mode
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, StorageError> {
        if !self.mode.is_read() {
            return Err(StorageError::NotReadable);
        }
        let buffer = self.ensure_materialized().await?;
        Ok(buffer.read(buf)?)
    }

    async fn read_to_end(&mut self) -> Result<Vec<u8>, StorageError> {
        if !self.mode.is_read() {
            return Err(StorageError::NotReadable);
        }
        let buffer = self.ensure_materialized().await?;
        let mut content = Vec::new();
        buffer.read_to_end(&mut content)?;
        Ok(content)
    }

    async fn write(&mut self, buf: &[u8]) -> Result<usize, StorageError> {
        if !self.mode.is_write() {
            return Err(StorageError::NotWritable);
        }
        self.dirty = true;
        let buffer = self.ensure_materialized().await?;
        Ok(buffer.write(buf)?)
    }

    async fn seek(&mut self, pos: SeekFrom) -> Result<u64, StorageError> {
        let buffer = self.ensure_materialized().await?;
        Ok(buffer.seek(pos)?)
    }

    async fn size(&mut self) -> Result<u64, StorageError> {
        let buffer = self.ensure_materialized().await?;
        let pos = buffer.stream_position()?;
        let len = buffer.seek(SeekFrom::End(0))?;
        buffer.seek(SeekFrom::Start(pos))?;
        Ok(len)
    }

    async fn close(&mut self) -> Result<(), StorageError> {
        let Some(buffer) = self.buffer.as_mut() else {
            return Ok(());
        };
        if self.dirty {
            buffer.seek(SeekFrom::Start(0))?;
            let mut content = Vec::new();
            buffer.read_to_end(&mut content)?;
            // A failed flush leaves the buffer and dirty flag in place.
            self.storage.try_save(&self.name, &content).await?;
            self.dirty = false;
        }
        self.buffer = None;
        Ok(())
    }
}

impl Drop for SharePointFile {
    fn drop(&mut self) {
        if self.dirty && self.buffer.is_some() {
            warn!(
                "file handle for {} dropped without close, discarding buffered writes",
                self.name
            );
        }
    }
}
