//! Local page-image discovery.
//!
//! Scans one issue directory for page images, parses the page number from
//! the filename, and computes content fingerprints. Zero-length files are
//! split out of the scan: a zero-byte scan can never correctly match
//! anything remote and is reported as an integrity problem instead.

use crate::config::AuditConfig;
use crate::error::{GazetteError, Result};
use crate::hashing;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// One local scanned page, fingerprinted.
#[derive(Debug, Clone, Serialize)]
pub struct LocalPage {
    /// Absolute path of the page image.
    pub path: PathBuf,
    /// Page number token parsed from the filename.
    pub page_number: String,
    /// Content fingerprint (lowercase SHA-256 hex).
    pub fingerprint: String,
}

/// Result of scanning one issue directory.
#[derive(Debug, Default)]
pub struct PageScan {
    /// Pages that participate in reconciliation.
    pub pages: Vec<LocalPage>,
    /// Zero-byte files, excluded from matching.
    pub zero_length: Vec<PathBuf>,
}

/// Parse the page-number token out of a page filename.
///
/// Filenames follow the batch-scanning convention of underscore-delimited
/// tokens with the page number at a fixed position, e.g.
/// `sn0001_18990102_0004.tif` with token index 2 yields `0004`. Files that
/// do not carry enough tokens fall back to the whole stem, so a stray but
/// validly-named file still reconciles by content.
pub fn parse_page_number(path: &Path, token_index: usize) -> String {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    stem.split('_')
        .nth(token_index)
        .unwrap_or(stem)
        .to_string()
}

/// Scan `dir` for page images and fingerprint each one.
///
/// The walk is non-recursive into nested issues: one issue directory holds
/// one flat set of page scans, but derivative subdirectories (thumbnails,
/// tiles) are skipped by only descending one level.
pub fn scan_issue_dir(dir: impl AsRef<Path>, config: &AuditConfig) -> Result<PageScan> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(GazetteError::RootMissing(dir.to_path_buf()));
    }

    let mut scan = PageScan::default();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() || !config.is_page_file(entry.path()) {
            continue;
        }

        let len = entry
            .metadata()
            .map_err(|e| GazetteError::Io {
                message: e.to_string(),
                path: Some(entry.path().to_path_buf()),
                source: e.into_io_error(),
            })?
            .len();
        if len == 0 {
            debug!("Zero-length page file: {}", entry.path().display());
            scan.zero_length.push(entry.path().to_path_buf());
            continue;
        }

        let fingerprint = hashing::hash_file(entry.path())?;
        scan.pages.push(LocalPage {
            path: entry.path().to_path_buf(),
            page_number: parse_page_number(entry.path(), config.page_token_index),
            fingerprint,
        });
    }

    // Directory-order walks differ between filesystems; sort for stable
    // report output.
    scan.pages.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(scan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_parse_page_number_fixed_token() {
        assert_eq!(
            parse_page_number(Path::new("sn0001_18990102_0004.tif"), 2),
            "0004"
        );
    }

    #[test]
    fn test_parse_page_number_short_name_falls_back_to_stem() {
        assert_eq!(parse_page_number(Path::new("cover.tif"), 2), "cover");
    }

    #[test]
    fn test_scan_filters_and_fingerprints() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "sn0001_18990102_0001.tif", b"front page");
        write(dir.path(), "sn0001_18990102_0002.tif", b"second page");
        write(dir.path(), "metadata.php", b"<?php define('VOLUME', '12');");

        let scan = scan_issue_dir(dir.path(), &AuditConfig::default()).unwrap();
        assert_eq!(scan.pages.len(), 2);
        assert!(scan.zero_length.is_empty());
        assert_eq!(scan.pages[0].page_number, "0001");
        assert_eq!(scan.pages[1].page_number, "0002");
        assert_ne!(scan.pages[0].fingerprint, scan.pages[1].fingerprint);
    }

    #[test]
    fn test_scan_partitions_zero_length() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "sn0001_18990102_0001.tif", b"content");
        let empty = write(dir.path(), "sn0001_18990102_0002.tif", b"");

        let scan = scan_issue_dir(dir.path(), &AuditConfig::default()).unwrap();
        assert_eq!(scan.pages.len(), 1);
        assert_eq!(scan.zero_length, vec![empty]);
    }

    #[test]
    fn test_scan_skips_derivative_subdirs() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "sn0001_18990102_0001.tif", b"content");
        let tiles = dir.path().join("tiles");
        std::fs::create_dir(&tiles).unwrap();
        write(&tiles, "sn0001_18990102_0001.tif", b"tile");

        let scan = scan_issue_dir(dir.path(), &AuditConfig::default()).unwrap();
        assert_eq!(scan.pages.len(), 1);
    }

    #[test]
    fn test_scan_missing_dir() {
        let result = scan_issue_dir("/nonexistent/archive", &AuditConfig::default());
        assert!(matches!(result, Err(GazetteError::RootMissing(_))));
    }
}
