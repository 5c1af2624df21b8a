//! Audit report accumulation and rendering.
//!
//! The report is an explicit value threaded through the audit walk by
//! mutable reference, so the per-issue logic stays independently testable.
//! It is read once at the end of a run: rendered as text, serialized as
//! JSON, or dumped to a plain-text ledger for the ingest workflow.

use crate::catalog::EntityId;
use crate::error::{GazetteError, Result};
use crate::reconcile::ReconciliationResult;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// One issue directory matched by more than one remote entity.
#[derive(Debug, Clone, Serialize)]
pub struct DuplicateIssue {
    pub issue_dir: PathBuf,
    pub candidates: Vec<EntityId>,
}

/// Reconciliation outcome for one (issue directory, remote entity) pair.
#[derive(Debug, Clone, Serialize)]
pub struct IssueFinding {
    pub issue_dir: PathBuf,
    pub entity_id: EntityId,
    pub reconciliation: ReconciliationResult,
}

/// A per-issue error that did not stop the walk.
#[derive(Debug, Clone, Serialize)]
pub struct IssueFailure {
    pub issue_dir: PathBuf,
    pub message: String,
}

/// Findings accumulated across one audit walk.
#[derive(Debug, Serialize)]
pub struct AuditReport {
    /// When the walk started.
    pub started_at: DateTime<Utc>,
    /// Issue directories audited (including failed ones).
    pub issues_walked: usize,
    /// Local page files of zero bytes.
    pub zero_length_local: Vec<PathBuf>,
    /// Remote page paths whose content is zero bytes.
    pub zero_length_remote: Vec<String>,
    /// Issues with more than one remote candidate.
    pub duplicate_issues: Vec<DuplicateIssue>,
    /// Issues with no remote candidate at all.
    pub missing_issues: Vec<PathBuf>,
    /// Per-candidate reconciliation results.
    pub findings: Vec<IssueFinding>,
    /// Per-issue errors recorded during the walk.
    pub failures: Vec<IssueFailure>,
}

impl AuditReport {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            issues_walked: 0,
            zero_length_local: Vec::new(),
            zero_length_remote: Vec::new(),
            duplicate_issues: Vec::new(),
            missing_issues: Vec::new(),
            findings: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn record_failure(&mut self, issue_dir: impl Into<PathBuf>, message: impl Into<String>) {
        self.failures.push(IssueFailure {
            issue_dir: issue_dir.into(),
            message: message.into(),
        });
    }

    /// Count of missing pages across all findings (both directions).
    pub fn missing_page_count(&self) -> usize {
        self.findings
            .iter()
            .map(|f| {
                f.reconciliation.missing_on_remote.len() + f.reconciliation.missing_on_local.len()
            })
            .sum()
    }

    /// Count of duplicate fingerprint groups across all findings.
    pub fn duplicate_group_count(&self) -> usize {
        self.findings
            .iter()
            .map(|f| {
                f.reconciliation.duplicates_on_remote.len()
                    + f.reconciliation.duplicates_on_local.len()
            })
            .sum()
    }

    /// True if anything in the archive disagrees with the catalog.
    pub fn has_discrepancies(&self) -> bool {
        !self.zero_length_local.is_empty()
            || !self.zero_length_remote.is_empty()
            || !self.duplicate_issues.is_empty()
            || !self.missing_issues.is_empty()
            || !self.failures.is_empty()
            || self.findings.iter().any(|f| !f.reconciliation.is_clean())
    }

    /// Render the headline summary as plain text.
    pub fn render_summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Audit summary ({} issue(s) walked)", self.issues_walked);
        let _ = writeln!(out, "  missing remote issues:   {}", self.missing_issues.len());
        let _ = writeln!(out, "  duplicate remote issues: {}", self.duplicate_issues.len());
        let _ = writeln!(
            out,
            "  zero-length files:       {} local, {} remote",
            self.zero_length_local.len(),
            self.zero_length_remote.len()
        );
        let _ = writeln!(out, "  missing pages:           {}", self.missing_page_count());
        let _ = writeln!(out, "  duplicate page groups:   {}", self.duplicate_group_count());
        let _ = writeln!(out, "  per-issue failures:      {}", self.failures.len());
        out
    }

    /// Write the full discrepancy ledger as plain text.
    pub fn write_ledger(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut out = String::new();
        let _ = writeln!(out, "# gazette audit ledger, started {}", self.started_at);
        let _ = write!(out, "{}", self.render_summary());

        for dir in &self.missing_issues {
            let _ = writeln!(out, "missing-issue\t{}", dir.display());
        }
        for dup in &self.duplicate_issues {
            let _ = writeln!(
                out,
                "duplicate-issue\t{}\t{:?}",
                dup.issue_dir.display(),
                dup.candidates
            );
        }
        for file in &self.zero_length_local {
            let _ = writeln!(out, "zero-length-local\t{}", file.display());
        }
        for target in &self.zero_length_remote {
            let _ = writeln!(out, "zero-length-remote\t{}", target);
        }
        for finding in &self.findings {
            for page in &finding.reconciliation.missing_on_remote {
                let _ = writeln!(
                    out,
                    "missing-on-remote\t{}\t{}\tpage {}",
                    finding.issue_dir.display(),
                    finding.entity_id,
                    page.page_number
                );
            }
            for page in &finding.reconciliation.missing_on_local {
                let _ = writeln!(
                    out,
                    "missing-on-local\t{}\t{}\tpage {}",
                    finding.issue_dir.display(),
                    finding.entity_id,
                    page.page_number
                );
            }
            for (fingerprint, members) in &finding.reconciliation.duplicates_on_local {
                let pages: Vec<&str> = members.iter().map(|p| p.page_number.as_str()).collect();
                let _ = writeln!(
                    out,
                    "duplicate-local\t{}\t{}\tpages {:?}",
                    finding.issue_dir.display(),
                    fingerprint,
                    pages
                );
            }
            for (fingerprint, members) in &finding.reconciliation.duplicates_on_remote {
                let pages: Vec<&str> = members.iter().map(|p| p.page_number.as_str()).collect();
                let _ = writeln!(
                    out,
                    "duplicate-remote\t{}\t{}\tpages {:?}",
                    finding.issue_dir.display(),
                    fingerprint,
                    pages
                );
            }
        }
        for failure in &self.failures {
            let _ = writeln!(
                out,
                "failure\t{}\t{}",
                failure.issue_dir.display(),
                failure.message
            );
        }

        std::fs::write(path, out).map_err(|e| GazetteError::io_with_path(e, path))
    }
}

impl Default for AuditReport {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::PageRef;

    #[test]
    fn test_empty_report_has_no_discrepancies() {
        assert!(!AuditReport::new().has_discrepancies());
    }

    #[test]
    fn test_failures_count_as_discrepancies() {
        let mut report = AuditReport::new();
        report.record_failure("/archive/1899-01-02", "catalog unreachable");
        assert!(report.has_discrepancies());
        assert_eq!(report.failures.len(), 1);
    }

    #[test]
    fn test_page_counters() {
        let mut report = AuditReport::new();
        let mut reconciliation = ReconciliationResult::default();
        reconciliation
            .missing_on_remote
            .push(PageRef::new("3", "abc"));
        report.findings.push(IssueFinding {
            issue_dir: PathBuf::from("/archive/1899-01-02"),
            entity_id: 41,
            reconciliation,
        });

        assert_eq!(report.missing_page_count(), 1);
        assert_eq!(report.duplicate_group_count(), 0);
        assert!(report.has_discrepancies());
    }

    #[test]
    fn test_write_ledger() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("ledger.txt");

        let mut report = AuditReport::new();
        report.missing_issues.push(PathBuf::from("/archive/v1n1"));
        report.write_ledger(&path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("missing-issue\t/archive/v1n1"));
        assert!(contents.contains("Audit summary"));
    }
}
