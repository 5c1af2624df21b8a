//! Remote catalog collaborators.
//!
//! The audit core only needs two things from the catalog side: which remote
//! entities claim to be a given issue, and which page files each entity
//! references. Both are behind traits so the orchestrator can be driven by
//! the REST client in production and by in-memory fakes in tests.

use crate::error::{GazetteError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Catalog entity identifier (a Drupal node id).
pub type EntityId = u64;

/// One page record as returned by the catalog.
#[derive(Debug, Clone, Deserialize)]
pub struct RemotePageRecord {
    /// Site-relative path of the page image.
    pub target_path: String,
    /// Page number recorded on the entity.
    pub page_number: String,
}

/// Read access to the remote catalog.
#[async_trait]
pub trait CatalogReader: Send + Sync {
    /// All entity ids claiming (parent title, volume, issue).
    async fn fetch_candidate_ids(
        &self,
        parent_title: &str,
        volume: &str,
        issue: &str,
    ) -> Result<Vec<EntityId>>;

    /// Page records attached to one entity.
    async fn fetch_pages(&self, entity_id: EntityId) -> Result<Vec<RemotePageRecord>>;
}

/// Byte access to remote page content, for fingerprinting.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// Fetch the content behind a site-relative path. `None` means the
    /// catalog references a file that does not exist.
    async fn fetch_bytes(&self, site_path: &str) -> Result<Option<Vec<u8>>>;
}

/// Map a site-relative path onto the webroot.
pub fn map_to_webroot(site_path: &str, webroot: &Path) -> PathBuf {
    webroot.join(site_path.trim_start_matches('/'))
}

/// REST client for the catalog's audit endpoints.
pub struct RestCatalog {
    client: Client,
    base_url: Url,
}

#[derive(Debug, Deserialize)]
struct CandidateRecord {
    id: EntityId,
}

impl RestCatalog {
    /// Create a client with an explicit request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url).map_err(|e| GazetteError::Config {
            message: format!("Invalid catalog base URL {}: {}", base_url, e),
        })?;
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("gazette/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, base_url })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| GazetteError::Config {
                message: format!("Catalog base URL cannot be a base: {}", self.base_url),
            })?
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: Url) -> Result<T> {
        debug!("GET {}", url);
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(GazetteError::CatalogStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl CatalogReader for RestCatalog {
    async fn fetch_candidate_ids(
        &self,
        parent_title: &str,
        volume: &str,
        issue: &str,
    ) -> Result<Vec<EntityId>> {
        let mut url = self.endpoint(&["issues"])?;
        url.query_pairs_mut()
            .append_pair("parent_title", parent_title)
            .append_pair("volume", volume)
            .append_pair("issue", issue);
        let candidates: Vec<CandidateRecord> = self.get_json(url).await?;
        Ok(candidates.into_iter().map(|c| c.id).collect())
    }

    async fn fetch_pages(&self, entity_id: EntityId) -> Result<Vec<RemotePageRecord>> {
        let url = self.endpoint(&["issues", &entity_id.to_string(), "pages"])?;
        self.get_json(url).await
    }
}

/// Fetcher that resolves site-relative paths under a local webroot.
///
/// The catalog and the audit host share a filesystem (or a mount of it), so
/// "fetching" remote content is a webroot read, not an HTTP download.
pub struct WebrootFetcher {
    webroot: PathBuf,
}

impl WebrootFetcher {
    pub fn new(webroot: impl Into<PathBuf>) -> Self {
        Self {
            webroot: webroot.into(),
        }
    }
}

#[async_trait]
impl ContentFetcher for WebrootFetcher {
    async fn fetch_bytes(&self, site_path: &str) -> Result<Option<Vec<u8>>> {
        let path = map_to_webroot(site_path, &self.webroot);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(GazetteError::io_with_path(e, path)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_to_webroot_strips_leading_slash() {
        let mapped = map_to_webroot("/sites/default/files/p1.jp2", Path::new("/var/www/html"));
        assert_eq!(
            mapped,
            PathBuf::from("/var/www/html/sites/default/files/p1.jp2")
        );
    }

    #[test]
    fn test_rest_catalog_rejects_bad_url() {
        assert!(RestCatalog::new("not a url", Duration::from_secs(1)).is_err());
    }

    #[tokio::test]
    async fn test_webroot_fetcher() {
        let dir = tempfile::TempDir::new().unwrap();
        let files = dir.path().join("files");
        std::fs::create_dir(&files).unwrap();
        std::fs::write(files.join("p1.jp2"), b"page one").unwrap();

        let fetcher = WebrootFetcher::new(dir.path());
        let bytes = fetcher.fetch_bytes("/files/p1.jp2").await.unwrap();
        assert_eq!(bytes.as_deref(), Some(&b"page one"[..]));

        let missing = fetcher.fetch_bytes("/files/absent.jp2").await.unwrap();
        assert!(missing.is_none());
    }
}
