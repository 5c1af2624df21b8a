//! Content reconciliation between a local page set and a remote page set.
//!
//! Matching is by fingerprint only: page numbering can shift between the
//! scan and the catalog, but identical content must still match. The
//! empty-content sentinel never matches and never forms a duplicate group;
//! zero-length pages are an integrity problem the caller reports separately.
//!
//! Equal set sizes are deliberately not a shortcut — two sets of the same
//! size can still differ entirely, so the full diff always runs.

use crate::hashing::is_empty_hash;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

/// One page in a reconciliation input set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageRef {
    /// Page number as recorded on this side.
    pub page_number: String,
    /// Content fingerprint (lowercase SHA-256 hex).
    pub fingerprint: String,
}

impl PageRef {
    pub fn new(page_number: impl Into<String>, fingerprint: impl Into<String>) -> Self {
        Self {
            page_number: page_number.into(),
            fingerprint: fingerprint.into(),
        }
    }
}

/// Outcome of diffing one issue's local pages against one remote entity.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconciliationResult {
    /// Local pages whose content appears nowhere in the remote set.
    pub missing_on_remote: Vec<PageRef>,
    /// Remote pages whose content appears nowhere in the local set.
    pub missing_on_local: Vec<PageRef>,
    /// Remote fingerprints carried by two or more remote pages.
    pub duplicates_on_remote: BTreeMap<String, Vec<PageRef>>,
    /// Local fingerprints carried by two or more local pages.
    pub duplicates_on_local: BTreeMap<String, Vec<PageRef>>,
    /// Count of distinct fingerprints present on both sides.
    pub matched_fingerprints: usize,
}

impl ReconciliationResult {
    /// True when the two sides carry identical content with no duplicates.
    pub fn is_clean(&self) -> bool {
        self.missing_on_remote.is_empty()
            && self.missing_on_local.is_empty()
            && self.duplicates_on_remote.is_empty()
            && self.duplicates_on_local.is_empty()
    }

    /// Total discrepancy count, for headline reporting.
    pub fn discrepancies(&self) -> usize {
        self.missing_on_remote.len()
            + self.missing_on_local.len()
            + self.duplicates_on_remote.len()
            + self.duplicates_on_local.len()
    }
}

/// Diff a local page set against a remote page set by content fingerprint.
///
/// Sentinel (zero-length) entries are excluded from matching entirely: they
/// appear in neither missing list and never form a duplicate group. An
/// empty local set yields `missing_on_remote = []` and every remote page in
/// `missing_on_local`, and symmetrically for an empty remote set.
pub fn diff(local: &[PageRef], remote: &[PageRef]) -> ReconciliationResult {
    let local_fps: HashSet<&str> = local
        .iter()
        .filter(|p| !is_empty_hash(&p.fingerprint))
        .map(|p| p.fingerprint.as_str())
        .collect();
    let remote_fps: HashSet<&str> = remote
        .iter()
        .filter(|p| !is_empty_hash(&p.fingerprint))
        .map(|p| p.fingerprint.as_str())
        .collect();

    let missing_on_remote = local
        .iter()
        .filter(|p| !is_empty_hash(&p.fingerprint) && !remote_fps.contains(p.fingerprint.as_str()))
        .cloned()
        .collect();
    let missing_on_local = remote
        .iter()
        .filter(|p| !is_empty_hash(&p.fingerprint) && !local_fps.contains(p.fingerprint.as_str()))
        .cloned()
        .collect();

    ReconciliationResult {
        missing_on_remote,
        missing_on_local,
        duplicates_on_remote: group_duplicates(remote),
        duplicates_on_local: group_duplicates(local),
        matched_fingerprints: local_fps.intersection(&remote_fps).count(),
    }
}

/// Group one side's pages by fingerprint and keep groups with two or more
/// members. The empty-content sentinel is excluded.
fn group_duplicates(pages: &[PageRef]) -> BTreeMap<String, Vec<PageRef>> {
    let mut by_fingerprint: HashMap<&str, Vec<&PageRef>> = HashMap::new();
    for page in pages {
        if is_empty_hash(&page.fingerprint) {
            continue;
        }
        by_fingerprint
            .entry(page.fingerprint.as_str())
            .or_default()
            .push(page);
    }

    by_fingerprint
        .into_iter()
        .filter(|(_, members)| members.len() >= 2)
        .map(|(fp, members)| (fp.to_string(), members.into_iter().cloned().collect()))
        .collect()
}
