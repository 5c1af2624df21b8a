//! Audit run configuration.

use crate::error::{GazetteError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for an archive audit run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct AuditConfig {
    /// Webroot the catalog's site-relative page paths resolve under.
    pub webroot: PathBuf,
    /// File extensions considered page images (lowercase, no dot).
    pub page_extensions: Vec<String>,
    /// Name of the per-issue metadata file.
    pub metadata_file_name: String,
    /// Zero-based index of the underscore-delimited filename token that
    /// carries the page number (`sn0001_18990102_0004.tif` -> token 2).
    pub page_token_index: usize,
    /// Base URL of the remote catalog's REST endpoint.
    pub catalog_base_url: String,
    /// HTTP client timeout in seconds.
    pub http_timeout_secs: u64,
    /// Batch executor concurrency override. `None` samples the host CPU
    /// count and reserves 20% headroom.
    pub concurrency: Option<usize>,
}

impl AuditConfig {
    pub const DEFAULT_METADATA_FILE: &'static str = "metadata.php";
    pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
    pub const DEFAULT_PAGE_TOKEN_INDEX: usize = 2;

    /// Load configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents =
            std::fs::read_to_string(path).map_err(|e| GazetteError::io_with_path(e, path))?;
        let config: AuditConfig = serde_json::from_str(&contents).map_err(|e| GazetteError::Json {
            message: format!("Failed to parse {}: {}", path.display(), e),
            source: Some(e),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Sanity-check field values.
    pub fn validate(&self) -> Result<()> {
        if self.page_extensions.is_empty() {
            return Err(GazetteError::Config {
                message: "page_extensions must not be empty".to_string(),
            });
        }
        if self.metadata_file_name.is_empty() {
            return Err(GazetteError::Config {
                message: "metadata_file_name must not be empty".to_string(),
            });
        }
        if let Some(0) = self.concurrency {
            return Err(GazetteError::Config {
                message: "concurrency must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// True if `path` has one of the configured page-image extensions.
    pub fn is_page_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| {
                let ext = ext.to_ascii_lowercase();
                self.page_extensions.iter().any(|allowed| *allowed == ext)
            })
            .unwrap_or(false)
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            webroot: PathBuf::from("/var/www/html"),
            page_extensions: vec!["tif".to_string(), "tiff".to_string(), "jp2".to_string()],
            metadata_file_name: Self::DEFAULT_METADATA_FILE.to_string(),
            page_token_index: Self::DEFAULT_PAGE_TOKEN_INDEX,
            catalog_base_url: "http://localhost/api".to_string(),
            http_timeout_secs: Self::DEFAULT_HTTP_TIMEOUT_SECS,
            concurrency: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_validate() {
        AuditConfig::default().validate().unwrap();
    }

    #[test]
    fn test_is_page_file() {
        let config = AuditConfig::default();
        assert!(config.is_page_file(Path::new("a/sn0001_18990102_0004.tif")));
        assert!(config.is_page_file(Path::new("a/PAGE.TIFF")));
        assert!(!config.is_page_file(Path::new("a/metadata.php")));
        assert!(!config.is_page_file(Path::new("a/noext")));
    }

    #[test]
    fn test_load_partial_json_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{"webroot": "/srv/web", "http_timeout_secs": 5}"#)
            .unwrap();
        file.flush().unwrap();

        let config = AuditConfig::load(file.path()).unwrap();
        assert_eq!(config.webroot, PathBuf::from("/srv/web"));
        assert_eq!(config.http_timeout_secs, 5);
        assert_eq!(config.metadata_file_name, "metadata.php");
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let config = AuditConfig {
            concurrency: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
