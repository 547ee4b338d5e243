//! Pure path arithmetic from logical names to site addresses.

use crate::config::SharePointConfig;

/// Maps logical storage names onto the site's folder tree.
///
/// All methods are pure string arithmetic: no I/O, no normalization, no
/// encoding. Names are expected to be cleaned before they get here.
#[derive(Debug, Clone)]
pub struct SitePaths {
    root_dir: Option<String>,
    site_name: String,
    site_url: String,
}

impl SitePaths {
    pub fn new(config: &SharePointConfig) -> Self {
        Self {
            root_dir: config.root_dir.clone().filter(|dir| !dir.is_empty()),
            site_name: config.site_name.clone(),
            site_url: config.site_url(),
        }
    }

    /// Site-relative location: `{root_dir}/{name}`, or `name` when no root
    /// directory is configured.
    pub fn relative_url(&self, name: &str) -> String {
        match &self.root_dir {
            Some(root) => format!("{root}/{name}"),
            None => name.to_string(),
        }
    }

    /// [`relative_url`](Self::relative_url) with its final segment removed;
    /// empty for a single-segment result.
    pub fn relative_dir(&self, name: &str) -> String {
        let relative = self.relative_url(name);
        match relative.rfind('/') {
            Some(idx) => relative[..idx].to_string(),
            None => String::new(),
        }
    }

    /// Absolute server path: `/sites/{site_name}/{relative_url}`.
    pub fn server_relative_url(&self, name: &str) -> String {
        format!("/sites/{}/{}", self.site_name, self.relative_url(name))
    }

    /// Externally dereferenceable location: `{site_url}/{relative_url}`.
    pub fn public_uri(&self, name: &str) -> String {
        format!("{}/{}", self.site_url, self.relative_url(name))
    }
}
