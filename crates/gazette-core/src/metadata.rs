//! Per-issue metadata loading.
//!
//! Each issue directory in the archive carries a small legacy metadata file
//! of PHP `define()` constants written by the scanning vendor. The loader
//! never evaluates that file: it lifts the constants out with a regex and
//! normalizes them into a plain [`IssueMetadata`] record.

use crate::error::{GazetteError, Result};
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Normalized issue metadata consumed by the audit orchestrator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct IssueMetadata {
    /// Catalog ID of the parent newspaper title.
    pub parent_title_id: String,
    /// Volume number as printed on the masthead.
    pub volume: String,
    /// Issue number within the volume.
    pub issue: String,
    /// Edition label (morning, evening, extra), often empty.
    pub edition: String,
    /// Publication date, as recorded by the vendor.
    pub date: String,
    /// Pages known missing at scan time.
    pub missing_pages: Vec<String>,
    /// Free-text errata notes.
    pub errata: Vec<String>,
    /// Publication language code.
    pub language: String,
    /// Physical media the scan was taken from (microfilm, print).
    pub media: String,
}

/// Loader seam so tests and future formats can substitute fixtures.
#[async_trait]
pub trait MetadataLoader: Send + Sync {
    /// Load the metadata record for one issue directory.
    async fn load(&self, issue_dir: &Path) -> Result<IssueMetadata>;
}

/// Loader for the legacy `define('KEY', 'value');` metadata format.
pub struct PhpDefineLoader {
    file_name: String,
    define_re: Regex,
}

impl PhpDefineLoader {
    pub fn new(file_name: impl Into<String>) -> Self {
        // Matches define('KEY', 'value'); with either quote style and
        // optional whitespace. Values never contain escaped quotes in this
        // corpus.
        let define_re =
            Regex::new(r#"define\(\s*['"]([A-Z_]+)['"]\s*,\s*['"]([^'"]*)['"]\s*\)"#)
                .expect("static regex");
        Self {
            file_name: file_name.into(),
            define_re,
        }
    }

    fn parse(&self, path: &Path, contents: &str) -> Result<IssueMetadata> {
        let mut meta = IssueMetadata::default();
        let mut saw_any = false;

        for caps in self.define_re.captures_iter(contents) {
            saw_any = true;
            let value = caps[2].to_string();
            match &caps[1] {
                "PARENT_TITLE_ID" | "TITLE_ID" => meta.parent_title_id = value,
                "VOLUME" => meta.volume = value,
                "ISSUE" => meta.issue = value,
                "EDITION" => meta.edition = value,
                "DATE" => meta.date = value,
                "MISSING_PAGES" => meta.missing_pages = split_list(&value),
                "ERRATA" => meta.errata = split_list(&value),
                "LANGUAGE" => meta.language = value,
                "MEDIA" => meta.media = value,
                other => {
                    tracing::debug!("Ignoring unknown metadata constant {}", other);
                }
            }
        }

        if !saw_any {
            return Err(GazetteError::MetadataInvalid {
                path: path.to_path_buf(),
                message: "no define() constants found".to_string(),
            });
        }
        if meta.parent_title_id.is_empty() {
            return Err(GazetteError::MetadataInvalid {
                path: path.to_path_buf(),
                message: "PARENT_TITLE_ID is required".to_string(),
            });
        }
        Ok(meta)
    }
}

impl Default for PhpDefineLoader {
    fn default() -> Self {
        Self::new(crate::config::AuditConfig::DEFAULT_METADATA_FILE)
    }
}

#[async_trait]
impl MetadataLoader for PhpDefineLoader {
    async fn load(&self, issue_dir: &Path) -> Result<IssueMetadata> {
        let path = issue_dir.join(&self.file_name);
        if !path.exists() {
            return Err(GazetteError::MetadataMissing(path));
        }
        let contents = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| GazetteError::io_with_path(e, &path))?;
        self.parse(&path, &contents)
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"<?php
define('PARENT_TITLE_ID', 'sn0001');
define('VOLUME', '12');
define('ISSUE', '48');
define('EDITION', '');
define('DATE', '1899-01-02');
define('MISSING_PAGES', '3, 7');
define('LANGUAGE', 'en');
define('MEDIA', 'microfilm');
"#;

    #[tokio::test]
    async fn test_load_sample() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("metadata.php"), SAMPLE).unwrap();

        let loader = PhpDefineLoader::default();
        let meta = loader.load(dir.path()).await.unwrap();
        assert_eq!(meta.parent_title_id, "sn0001");
        assert_eq!(meta.volume, "12");
        assert_eq!(meta.issue, "48");
        assert_eq!(meta.missing_pages, vec!["3", "7"]);
        assert_eq!(meta.edition, "");
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let loader = PhpDefineLoader::default();
        let err = loader.load(dir.path()).await.unwrap_err();
        assert!(matches!(err, GazetteError::MetadataMissing(_)));
    }

    #[tokio::test]
    async fn test_load_malformed_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("metadata.php"), "<?php // nothing here").unwrap();

        let loader = PhpDefineLoader::default();
        let err = loader.load(dir.path()).await.unwrap_err();
        assert!(matches!(err, GazetteError::MetadataInvalid { .. }));
    }

    #[tokio::test]
    async fn test_missing_required_title() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("metadata.php"),
            "<?php define('VOLUME', '1');",
        )
        .unwrap();

        let loader = PhpDefineLoader::default();
        assert!(loader.load(dir.path()).await.is_err());
    }
}
