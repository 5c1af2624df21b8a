//! Issue audit orchestration.
//!
//! Walks an archive tree of issue directories and reconciles each one
//! against the remote catalog. The walk is best-effort: any per-issue
//! failure (missing metadata, catalog error, unreadable files) is recorded
//! in the report and the walk moves on. Only a missing archive root or an
//! archive with no issues at all aborts the run.

use crate::catalog::{CatalogReader, ContentFetcher, EntityId};
use crate::config::AuditConfig;
use crate::error::{GazetteError, Result};
use crate::hashing;
use crate::metadata::MetadataLoader;
use crate::pages::{self, PageScan};
use crate::reconcile::{self, PageRef};
use crate::report::{AuditReport, DuplicateIssue, IssueFinding};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Drives the per-issue audit state machine across an archive tree.
pub struct AuditOrchestrator {
    config: AuditConfig,
    catalog: Arc<dyn CatalogReader>,
    fetcher: Arc<dyn ContentFetcher>,
    metadata: Arc<dyn MetadataLoader>,
}

impl AuditOrchestrator {
    pub fn new(
        config: AuditConfig,
        catalog: Arc<dyn CatalogReader>,
        fetcher: Arc<dyn ContentFetcher>,
        metadata: Arc<dyn MetadataLoader>,
    ) -> Self {
        Self {
            config,
            catalog,
            fetcher,
            metadata,
        }
    }

    /// Audit every issue directory under `root`.
    pub async fn run(&self, root: impl AsRef<Path>) -> Result<AuditReport> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(GazetteError::RootMissing(root.to_path_buf()));
        }

        let (issue_dirs, page_file_count) = discover_issue_dirs(root, &self.config);
        if page_file_count == 0 {
            return Err(GazetteError::NoPagesFound(root.to_path_buf()));
        }
        info!("Auditing {} issue(s) under {}", issue_dirs.len(), root.display());

        let mut report = AuditReport::new();
        for issue_dir in issue_dirs {
            report.issues_walked += 1;
            if let Err(e) = self.audit_issue(&issue_dir, &mut report).await {
                warn!("Issue {} failed: {}", issue_dir.display(), e);
                report.record_failure(&issue_dir, e.to_string());
            }
        }

        info!("{}", report.render_summary().trim_end());
        Ok(report)
    }

    /// Audit one issue: metadata, candidate lookup, page scan, per-candidate
    /// reconciliation. Errors bubble to `run`, which records them.
    async fn audit_issue(&self, issue_dir: &Path, report: &mut AuditReport) -> Result<()> {
        let meta = self.metadata.load(issue_dir).await?;
        debug!(
            "Issue {}: title {} vol {} no {}",
            issue_dir.display(),
            meta.parent_title_id,
            meta.volume,
            meta.issue
        );

        let candidates = self
            .catalog
            .fetch_candidate_ids(&meta.parent_title_id, &meta.volume, &meta.issue)
            .await?;
        if candidates.is_empty() {
            info!("No remote entity for {}", issue_dir.display());
            report.missing_issues.push(issue_dir.to_path_buf());
            return Ok(());
        }
        if candidates.len() > 1 {
            // Data-quality flag; every candidate is still audited.
            warn!(
                "{} remote candidates for {}: {:?}",
                candidates.len(),
                issue_dir.display(),
                candidates
            );
            report.duplicate_issues.push(DuplicateIssue {
                issue_dir: issue_dir.to_path_buf(),
                candidates: candidates.clone(),
            });
        }

        let scan = self.scan_pages(issue_dir).await?;
        report.zero_length_local.extend(scan.zero_length.iter().cloned());
        let local_refs: Vec<PageRef> = scan
            .pages
            .iter()
            .map(|p| PageRef::new(&p.page_number, &p.fingerprint))
            .collect();

        for entity_id in candidates {
            let remote_refs = self.fetch_remote_refs(entity_id, report).await?;
            let reconciliation = reconcile::diff(&local_refs, &remote_refs);
            if !reconciliation.is_clean() {
                info!(
                    "Issue {} vs entity {}: {} discrepancy(ies)",
                    issue_dir.display(),
                    entity_id,
                    reconciliation.discrepancies()
                );
            }
            report.findings.push(IssueFinding {
                issue_dir: issue_dir.to_path_buf(),
                entity_id,
                reconciliation,
            });
        }

        Ok(())
    }

    /// Scan and fingerprint local pages on the blocking pool.
    async fn scan_pages(&self, issue_dir: &Path) -> Result<PageScan> {
        let dir = issue_dir.to_path_buf();
        let config = self.config.clone();
        tokio::task::spawn_blocking(move || pages::scan_issue_dir(&dir, &config))
            .await
            .map_err(|e| GazetteError::Other(format!("Page scan task failed: {}", e)))?
    }

    /// Fetch and fingerprint one entity's pages.
    ///
    /// A page whose backing file is absent is simply left out of the remote
    /// set (the local counterpart then surfaces as missing-on-remote); a
    /// zero-byte payload is recorded separately and excluded from matching.
    async fn fetch_remote_refs(
        &self,
        entity_id: EntityId,
        report: &mut AuditReport,
    ) -> Result<Vec<PageRef>> {
        let records = self.catalog.fetch_pages(entity_id).await?;
        let mut refs = Vec::with_capacity(records.len());
        for record in records {
            match self.fetcher.fetch_bytes(&record.target_path).await? {
                None => {
                    debug!(
                        "Entity {} references absent file {}",
                        entity_id, record.target_path
                    );
                }
                Some(bytes) if bytes.is_empty() => {
                    report.zero_length_remote.push(record.target_path);
                }
                Some(bytes) => {
                    refs.push(PageRef::new(record.page_number, hashing::hash_bytes(&bytes)));
                }
            }
        }
        Ok(refs)
    }
}

/// Find every issue directory under `root`, and count the page files seen.
///
/// An issue directory either carries the metadata file, or holds page
/// images with no metadata-carrying ancestor (a forgotten metadata file is
/// a findable failure, not an invisible directory). Derivative
/// subdirectories under a real issue are not issues of their own.
fn discover_issue_dirs(root: &Path, config: &AuditConfig) -> (Vec<PathBuf>, usize) {
    let mut meta_dirs: Vec<PathBuf> = Vec::new();
    let mut page_dirs: Vec<PathBuf> = Vec::new();
    let mut page_files = 0usize;

    for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(parent) = entry.path().parent() else {
            continue;
        };
        if entry.file_name().to_str() == Some(config.metadata_file_name.as_str()) {
            meta_dirs.push(parent.to_path_buf());
        } else if config.is_page_file(entry.path()) {
            page_files += 1;
            page_dirs.push(parent.to_path_buf());
        }
    }

    let mut dirs = meta_dirs.clone();
    for dir in page_dirs {
        if !meta_dirs.iter().any(|m| dir.starts_with(m)) {
            dirs.push(dir);
        }
    }
    dirs.sort();
    dirs.dedup();
    (dirs, page_files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discover_issue_dirs_nested() {
        let root = tempfile::TempDir::new().unwrap();
        let a = root.path().join("1899/01-02");
        let b = root.path().join("1899/01-09");
        std::fs::create_dir_all(&a).unwrap();
        std::fs::create_dir_all(&b).unwrap();
        std::fs::write(a.join("metadata.php"), "x").unwrap();
        std::fs::write(a.join("sn0001_18990102_0001.tif"), "p").unwrap();
        std::fs::write(b.join("metadata.php"), "x").unwrap();
        std::fs::create_dir_all(root.path().join("1899/empty")).unwrap();

        let (dirs, page_files) = discover_issue_dirs(root.path(), &AuditConfig::default());
        assert_eq!(dirs, vec![a, b]);
        assert_eq!(page_files, 1);
    }

    #[test]
    fn test_discover_pages_only_dir_is_an_issue() {
        let root = tempfile::TempDir::new().unwrap();
        let forgot = root.path().join("1899/01-16");
        std::fs::create_dir_all(&forgot).unwrap();
        std::fs::write(forgot.join("sn0001_18990116_0001.tif"), "p").unwrap();

        let (dirs, _) = discover_issue_dirs(root.path(), &AuditConfig::default());
        assert_eq!(dirs, vec![forgot]);
    }

    #[test]
    fn test_discover_skips_derivative_subdirs() {
        let root = tempfile::TempDir::new().unwrap();
        let issue = root.path().join("1899/01-02");
        let tiles = issue.join("tiles");
        std::fs::create_dir_all(&tiles).unwrap();
        std::fs::write(issue.join("metadata.php"), "x").unwrap();
        std::fs::write(issue.join("sn0001_18990102_0001.tif"), "p").unwrap();
        std::fs::write(tiles.join("sn0001_18990102_0001.tif"), "t").unwrap();

        let (dirs, _) = discover_issue_dirs(root.path(), &AuditConfig::default());
        assert_eq!(dirs, vec![issue]);
    }
}
