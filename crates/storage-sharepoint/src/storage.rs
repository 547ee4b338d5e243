//! Storage orchestrator over one SharePoint site.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::redirect;
use tokio::sync::OnceCell;
use tracing::{debug, instrument};

use storage_core::{
    base_name, best_effort, clean_name, OpenMode, Storage, StorageError, StorageFile,
};

use crate::auth::Session;
use crate::client::SharePointClient;
use crate::config::SharePointConfig;
use crate::file::SharePointFile;
use crate::paths::SitePaths;

/// Storage backed by a SharePoint document library.
///
/// Cheap to clone; clones share one HTTP client and one lazily-acquired
/// session. The [`Storage`] impl degrades every remote failure to the
/// operation's fallback value; the `try_*` methods expose the same
/// operations with structured errors.
#[derive(Clone)]
pub struct SharePointStorage {
    inner: Arc<Inner>,
}

struct Inner {
    config: SharePointConfig,
    paths: SitePaths,
    client: SharePointClient,
    http: reqwest::Client,
    session: OnceCell<Session>,
}

impl SharePointStorage {
    /// Builds a storage from a validated configuration.
    ///
    /// No remote traffic happens here; the session is acquired on first use.
    pub fn new(config: SharePointConfig) -> Result<Self, StorageError> {
        config.validate()?;
        // Redirects stay disabled: the user sign-in endpoint answers with a
        // redirect whose cookies must be read, not followed.
        let http = reqwest::Client::builder()
            .redirect(redirect::Policy::none())
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| StorageError::Config(format!("failed to build HTTP client: {e}")))?;
        let paths = SitePaths::new(&config);
        let client = SharePointClient::new(http.clone(), config.site_url());
        Ok(Self {
            inner: Arc::new(Inner {
                config,
                paths,
                client,
                http,
                session: OnceCell::new(),
            }),
        })
    }

    /// Builds a storage from `SHAREPOINT_*` environment variables.
    pub fn from_env() -> Result<Self, StorageError> {
        Self::new(SharePointConfig::from_env()?)
    }

    /// Path resolver for this site.
    pub fn paths(&self) -> &SitePaths {
        &self.inner.paths
    }

    pub(crate) fn max_memory_size(&self) -> usize {
        self.inner.config.max_memory_size
    }

    /// The cached session, acquired on first call.
    async fn session(&self) -> Result<&Session, StorageError> {
        self.inner
            .session
            .get_or_try_init(|| Session::acquire(&self.inner.http, &self.inner.config))
            .await
    }

    /// Whether `name` currently exists remotely.
    pub async fn try_exists(&self, name: &str) -> Result<bool, StorageError> {
        let session = self.session().await?;
        let path = self.inner.paths.server_relative_url(name);
        let file = self.inner.client.get_file(session, &path).await?;
        Ok(file.is_some_and(|f| f.exists))
    }

    /// Size of `name` in bytes; a missing file is an error here.
    pub async fn try_size(&self, name: &str) -> Result<i64, StorageError> {
        let session = self.session().await?;
        let path = self.inner.paths.server_relative_url(name);
        match self.inner.client.get_file(session, &path).await? {
            Some(file) if file.exists => Ok(file.length),
            _ => Err(StorageError::NotFound(name.to_string())),
        }
    }

    /// Soft-deletes `name` into the recycle bin.
    pub async fn try_delete(&self, name: &str) -> Result<(), StorageError> {
        let session = self.session().await?;
        let path = self.inner.paths.server_relative_url(name);
        self.inner.client.recycle(session, &path).await
    }

    /// Full content of `name`, or `None` if it does not exist.
    pub async fn try_fetch(&self, name: &str) -> Result<Option<bytes::Bytes>, StorageError> {
        let session = self.session().await?;
        let path = self.inner.paths.server_relative_url(name);
        self.inner.client.download(session, &path).await
    }

    /// Ensures every segment of `path` exists as a folder, root to leaf.
    ///
    /// Segment failures are logged and skipped; later segments are still
    /// attempted. The error channel only reports a failure to establish the
    /// session.
    pub async fn try_create_dir(&self, path: &str) -> Result<(), StorageError> {
        if path.is_empty() {
            return Ok(());
        }
        let session = self.session().await?;
        self.ensure_dirs(session, path).await;
        Ok(())
    }

    /// Uploads `content` under the cleaned `name` and checks it in.
    ///
    /// An existing file is recycled first; overwrite is delete plus fresh
    /// upload, so a concurrent reader can observe the name briefly absent.
    pub async fn try_save(&self, name: &str, content: &[u8]) -> Result<String, StorageError> {
        let cleaned = clean_name(name);
        let session = self.session().await?;
        let dir = self.inner.paths.relative_dir(&cleaned);
        let file_name = base_name(&cleaned).to_string();

        // Probe and recycle are best-effort; a failed delete must not stop
        // the upload.
        let present = best_effort("exists", &cleaned, self.try_exists(&cleaned).await, false);
        if present {
            best_effort("delete", &cleaned, self.try_delete(&cleaned).await, ());
        }
        self.ensure_dirs(session, &dir).await;

        let content_type = mime_guess::from_path(&file_name).first_or_octet_stream();
        self.inner
            .client
            .upload_file(session, &dir, &file_name, content, content_type.essence_str())
            .await?;
        let path = self.inner.paths.server_relative_url(&cleaned);
        self.inner.client.checkin(session, &path).await?;
        debug!("saved {} bytes as: {}", content.len(), cleaned);
        Ok(cleaned)
    }

    /// Organization sharing link for `name`.
    pub async fn try_url(&self, name: &str) -> Result<String, StorageError> {
        let session = self.session().await?;
        let uri = self.inner.paths.public_uri(name);
        self.inner
            .client
            .create_organization_sharing_link(session, &uri, false)
            .await
    }

    async fn ensure_dirs(&self, session: &Session, dir: &str) {
        if dir.is_empty() {
            return;
        }
        let mut prefix = String::new();
        for segment in dir.split('/') {
            if !prefix.is_empty() {
                prefix.push('/');
            }
            prefix.push_str(segment);
            best_effort(
                "create_dir",
                &prefix,
                self.inner.client.add_folder(session, &prefix).await,
                (),
            );
        }
    }
}

#[async_trait]
impl Storage for SharePointStorage {
    fn open(&self, name: &str, mode: OpenMode) -> Box<dyn StorageFile> {
        Box::new(SharePointFile::new(name, mode, self.clone()))
    }

    #[instrument(skip(self), level = "debug")]
    async fn exists(&self, name: &str) -> bool {
        best_effort("exists", name, self.try_exists(name).await, false)
    }

    #[instrument(skip(self), level = "debug")]
    async fn size(&self, name: &str) -> i64 {
        best_effort("size", name, self.try_size(name).await, -1)
    }

    #[instrument(skip(self), level = "debug")]
    async fn delete(&self, name: &str) {
        best_effort("delete", name, self.try_delete(name).await, ());
    }

    #[instrument(skip(self), level = "debug")]
    async fn create_dir(&self, path: &str) {
        best_effort("create_dir", path, self.try_create_dir(path).await, ());
    }

    #[instrument(skip(self, content), level = "debug", fields(content_len = content.len()))]
    async fn save(&self, name: &str, content: &[u8]) -> String {
        let fallback = clean_name(name);
        best_effort("save", name, self.try_save(name, content).await, fallback)
    }

    #[instrument(skip(self), level = "debug")]
    async fn url(&self, name: &str) -> String {
        best_effort("url", name, self.try_url(name).await, name.to_string())
    }
}

impl std::fmt::Debug for SharePointStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharePointStorage")
            .field("site_url", &self.inner.config.site_url())
            .field("root_dir", &self.inner.config.root_dir)
            .finish()
    }
}
