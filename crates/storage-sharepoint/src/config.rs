//! Backend configuration.

use std::env;

use serde::Deserialize;
use storage_core::StorageError;

use crate::auth::Credentials;

fn default_max_memory_size() -> usize {
    16 * 1024 * 1024
}

/// Settings for one SharePoint document library.
///
/// Credentials come in two flavors: an app principal (`client_id` +
/// `client_secret`, plus `tenant_id` for the token authority) or a plain
/// user account (`username` + `password`). When both pairs are present the
/// app principal wins.
#[derive(Debug, Clone, Deserialize)]
pub struct SharePointConfig {
    /// Tenant short name, the `{tenant}` in `https://{tenant}.sharepoint.com`.
    pub tenant: String,
    /// Azure AD directory id, required for app authentication.
    #[serde(default)]
    pub tenant_id: String,
    /// Site the document library lives under.
    pub site_name: String,
    /// App principal id.
    #[serde(default)]
    pub client_id: String,
    /// App principal secret.
    #[serde(default)]
    pub client_secret: String,
    /// User login for the legacy sign-in flow.
    #[serde(default)]
    pub username: String,
    /// User password for the legacy sign-in flow.
    #[serde(default)]
    pub password: String,
    /// Directory all names are resolved under, relative to the site.
    /// Empty or absent means names resolve at the site root.
    pub root_dir: Option<String>,
    /// Bytes a file buffer may hold in memory before spooling to disk.
    #[serde(default = "default_max_memory_size")]
    pub max_memory_size: usize,
    /// Replaces `https://{tenant}.sharepoint.com` (tests, sovereign clouds).
    pub endpoint: Option<String>,
    /// Replaces the Microsoft login host (tests, sovereign clouds).
    pub login_endpoint: Option<String>,
}

impl SharePointConfig {
    /// Builds a configuration from `SHAREPOINT_*` environment variables.
    pub fn from_env() -> Result<Self, StorageError> {
        let max_memory_size = match env::var("SHAREPOINT_BLOB_MAX_MEMORY_SIZE") {
            Ok(raw) if !raw.is_empty() => raw.parse().map_err(|_| {
                StorageError::Config(format!(
                    "SHAREPOINT_BLOB_MAX_MEMORY_SIZE is not a byte count: {raw}"
                ))
            })?,
            _ => default_max_memory_size(),
        };

        let config = Self {
            tenant: require("SHAREPOINT_TENANT")?,
            tenant_id: optional("SHAREPOINT_TENANT_ID"),
            site_name: require("SHAREPOINT_SITE_NAME")?,
            client_id: optional("SHAREPOINT_CLIENT_ID"),
            client_secret: optional("SHAREPOINT_CLIENT_SECRET"),
            username: optional("SHAREPOINT_USERNAME"),
            password: optional("SHAREPOINT_PASSWORD"),
            root_dir: env::var("SHAREPOINT_ROOT_DIR").ok().filter(|d| !d.is_empty()),
            max_memory_size,
            endpoint: None,
            login_endpoint: None,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks the configuration is complete enough to build a storage from.
    pub fn validate(&self) -> Result<(), StorageError> {
        if self.tenant.is_empty() {
            return Err(StorageError::MissingSetting("SHAREPOINT_TENANT"));
        }
        if self.site_name.is_empty() {
            return Err(StorageError::MissingSetting("SHAREPOINT_SITE_NAME"));
        }
        if self.max_memory_size == 0 {
            return Err(StorageError::Config(
                "max_memory_size must be greater than zero".to_string(),
            ));
        }
        self.credentials().map(|_| ())
    }

    /// Base URL of the tenant, e.g. `https://contoso.sharepoint.com`.
    pub fn sharepoint_url(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => format!("https://{}.sharepoint.com", self.tenant),
        }
    }

    /// Base URL of the site, e.g. `https://contoso.sharepoint.com/sites/docs`.
    pub fn site_url(&self) -> String {
        format!("{}/sites/{}", self.sharepoint_url(), self.site_name)
    }

    /// Base URL of the Microsoft login service.
    pub fn login_url(&self) -> String {
        match &self.login_endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => "https://login.microsoftonline.com".to_string(),
        }
    }

    /// True when an app principal is configured.
    pub fn use_app_auth(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }

    pub(crate) fn credentials(&self) -> Result<Credentials, StorageError> {
        if self.use_app_auth() {
            if self.tenant_id.is_empty() {
                return Err(StorageError::MissingSetting("SHAREPOINT_TENANT_ID"));
            }
            Ok(Credentials::Client {
                id: self.client_id.clone(),
                secret: self.client_secret.clone(),
            })
        } else if !self.username.is_empty() && !self.password.is_empty() {
            Ok(Credentials::User {
                username: self.username.clone(),
                password: self.password.clone(),
            })
        } else {
            Err(StorageError::Config(
                "no usable credentials: configure client_id/client_secret or username/password"
                    .to_string(),
            ))
        }
    }
}

fn require(name: &'static str) -> Result<String, StorageError> {
    match env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(StorageError::MissingSetting(name)),
    }
}

fn optional(name: &str) -> String {
    env::var(name).unwrap_or_default()
}
