//! Core traits and types shared by storage backends.
//!
//! This crate defines the storage abstraction a web application codes
//! against, independent of any concrete backend:
//! - `Storage`: the backend contract (open, save, exists, delete, size, url)
//! - `StorageFile`: an open file handle with explicit read/write/close
//! - `StorageError`: the error taxonomy shared across backends
//! - name hygiene (`clean_name`, `base_name`) and the `best_effort`
//!   sentinel-conversion policy

mod error;
mod file;
mod paths;
mod storage;

pub use error::StorageError;
pub use file::{OpenMode, StorageFile};
pub use paths::{base_name, clean_name};
pub use storage::{best_effort, Storage};
