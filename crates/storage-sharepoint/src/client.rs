//! Thin client over the SharePoint REST API.
//!
//! All calls speak JSON with `odata=nometadata` and address files by
//! server-relative path inside an OData string literal. Missing resources
//! answer 404, surfaced as `Ok(None)` on the read calls; every other
//! non-success status becomes [`StorageError::Remote`].

use bytes::Bytes;
use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Deserializer};
use tracing::{debug, instrument};

use storage_core::StorageError;

use crate::auth::Session;

const ACCEPT_JSON: &str = "application/json;odata=nometadata";
const DIGEST_HEADER: &str = "X-RequestDigest";

/// File metadata returned by the probe call.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct SpFile {
    #[serde(default)]
    pub(crate) exists: bool,
    #[serde(default, deserialize_with = "int64_lenient")]
    pub(crate) length: i64,
}

/// Stateless REST client; the session travels with each call.
#[derive(Debug)]
pub(crate) struct SharePointClient {
    http: Client,
    api_base: String,
}

impl SharePointClient {
    pub(crate) fn new(http: Client, site_url: String) -> Self {
        Self {
            http,
            api_base: format!("{site_url}/_api"),
        }
    }

    /// Fetches existence and length for a server-relative path.
    #[instrument(skip(self, session), level = "debug")]
    pub(crate) async fn get_file(
        &self,
        session: &Session,
        path: &str,
    ) -> Result<Option<SpFile>, StorageError> {
        let url = format!(
            "{}/web/GetFileByServerRelativeUrl('{}')?$select=Exists,Length",
            self.api_base,
            odata_path(path)
        );
        debug!("probing file: {}", path);
        let resp = session
            .apply(self.http.get(&url))
            .header(header::ACCEPT, ACCEPT_JSON)
            .send()
            .await
            .map_err(transport)?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = check(resp).await?;
        let file: SpFile = resp.json().await.map_err(transport)?;
        Ok(Some(file))
    }

    /// Downloads the full content of a server-relative path.
    #[instrument(skip(self, session), level = "debug")]
    pub(crate) async fn download(
        &self,
        session: &Session,
        path: &str,
    ) -> Result<Option<Bytes>, StorageError> {
        let url = format!(
            "{}/web/GetFileByServerRelativeUrl('{}')/$value",
            self.api_base,
            odata_path(path)
        );
        debug!("downloading file: {}", path);
        let resp = session
            .apply(self.http.get(&url))
            .header(header::ACCEPT, ACCEPT_JSON)
            .send()
            .await
            .map_err(transport)?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = check(resp).await?;
        Ok(Some(resp.bytes().await.map_err(transport)?))
    }

    /// Soft-deletes a file into the site recycle bin.
    #[instrument(skip(self, session), level = "debug")]
    pub(crate) async fn recycle(&self, session: &Session, path: &str) -> Result<(), StorageError> {
        let url = format!(
            "{}/web/GetFileByServerRelativeUrl('{}')/recycle",
            self.api_base,
            odata_path(path)
        );
        debug!("recycling file: {}", path);
        self.post_empty(session, url).await
    }

    /// Creates a single folder; parents must already exist.
    #[instrument(skip(self, session), level = "debug")]
    pub(crate) async fn add_folder(&self, session: &Session, dir: &str) -> Result<(), StorageError> {
        let url = format!("{}/web/folders/add('{}')", self.api_base, odata_path(dir));
        debug!("creating folder: {}", dir);
        self.post_empty(session, url).await
    }

    /// Uploads `content` as `file_name` into an existing folder.
    #[instrument(skip(self, session, content), level = "debug", fields(content_len = content.len()))]
    pub(crate) async fn upload_file(
        &self,
        session: &Session,
        dir: &str,
        file_name: &str,
        content: &[u8],
        content_type: &str,
    ) -> Result<(), StorageError> {
        let url = format!(
            "{}/web/GetFolderByServerRelativeUrl('{}')/Files/add(url='{}',overwrite=true)",
            self.api_base,
            odata_path(dir),
            odata_path(file_name)
        );
        debug!("uploading {} bytes to folder: {}", content.len(), dir);
        let mut req = session
            .apply(self.http.post(&url))
            .header(header::ACCEPT, ACCEPT_JSON)
            .header(header::CONTENT_TYPE, content_type)
            .body(content.to_vec());
        if session.needs_digest() {
            req = req.header(DIGEST_HEADER, self.form_digest(session).await?);
        }
        let resp = req.send().await.map_err(transport)?;
        check(resp).await?;
        Ok(())
    }

    /// Checks in a file as a new major version with an empty comment.
    #[instrument(skip(self, session), level = "debug")]
    pub(crate) async fn checkin(&self, session: &Session, path: &str) -> Result<(), StorageError> {
        let url = format!(
            "{}/web/GetFileByServerRelativeUrl('{}')/CheckIn(comment='',checkintype=1)",
            self.api_base,
            odata_path(path)
        );
        debug!("checking in file: {}", path);
        self.post_empty(session, url).await
    }

    /// Requests an organization-scoped sharing link for a resource URI.
    #[instrument(skip(self, session), level = "debug")]
    pub(crate) async fn create_organization_sharing_link(
        &self,
        session: &Session,
        resource_uri: &str,
        edit: bool,
    ) -> Result<String, StorageError> {
        #[derive(Deserialize)]
        struct SharingLink {
            value: String,
        }

        let url = format!("{}/SP.Web.CreateOrganizationSharingLink", self.api_base);
        debug!("requesting sharing link for: {}", resource_uri);
        let mut req = session
            .apply(self.http.post(&url))
            .header(header::ACCEPT, ACCEPT_JSON)
            .json(&serde_json::json!({ "url": resource_uri, "isEditLink": edit }));
        if session.needs_digest() {
            req = req.header(DIGEST_HEADER, self.form_digest(session).await?);
        }
        let resp = req.send().await.map_err(transport)?;
        let resp = check(resp).await?;
        let link: SharingLink = resp.json().await.map_err(transport)?;
        Ok(link.value)
    }

    async fn post_empty(&self, session: &Session, url: String) -> Result<(), StorageError> {
        let mut req = session
            .apply(self.http.post(&url))
            .header(header::ACCEPT, ACCEPT_JSON);
        if session.needs_digest() {
            req = req.header(DIGEST_HEADER, self.form_digest(session).await?);
        }
        let resp = req.send().await.map_err(transport)?;
        check(resp).await?;
        Ok(())
    }

    /// Form digest for cookie-mode write requests, fetched once per session.
    async fn form_digest<'a>(&self, session: &'a Session) -> Result<&'a str, StorageError> {
        session
            .form_digest
            .get_or_try_init(|| async {
                #[derive(Deserialize)]
                #[serde(rename_all = "PascalCase")]
                struct ContextInfo {
                    form_digest_value: String,
                }

                let url = format!("{}/contextinfo", self.api_base);
                debug!("fetching form digest");
                let resp = session
                    .apply(self.http.post(&url))
                    .header(header::ACCEPT, ACCEPT_JSON)
                    .send()
                    .await
                    .map_err(transport)?;
                let resp = check(resp).await?;
                let info: ContextInfo = resp.json().await.map_err(transport)?;
                Ok(info.form_digest_value)
            })
            .await
            .map(String::as_str)
    }
}

/// Embeds a path in an OData string literal: single quotes are doubled,
/// each segment percent-encoded, separators preserved.
fn odata_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(&segment.replace('\'', "''")).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn transport(err: reqwest::Error) -> StorageError {
    StorageError::Transport(err.to_string())
}

async fn check(resp: reqwest::Response) -> Result<reqwest::Response, StorageError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let detail = resp.text().await.unwrap_or_default();
    Err(StorageError::Remote {
        status: status.as_u16(),
        detail,
    })
}

/// SharePoint serializes Int64 as a JSON string in some OData modes.
fn int64_lenient<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(i64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
    }
}
