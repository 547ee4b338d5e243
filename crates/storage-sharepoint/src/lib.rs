//! SharePoint Online storage backend.
//!
//! Implements the [`storage_core::Storage`] and [`storage_core::StorageFile`]
//! traits on top of the SharePoint REST API. Files live in a document library
//! under a configurable root directory; handles buffer content locally in a
//! spooled temp file and talk to the service only when they have to.
//!
//! Two credential flavors are supported: an Azure AD app principal
//! (client id/secret, bearer token) and a plain user account (legacy STS
//! sign-in, cookie session). The session is established lazily on first
//! remote call and reused for the lifetime of the storage instance.

mod auth;
mod client;
mod config;
mod file;
mod paths;
mod storage;

pub use config::SharePointConfig;
pub use file::SharePointFile;
pub use paths::SitePaths;
pub use storage::SharePointStorage;
