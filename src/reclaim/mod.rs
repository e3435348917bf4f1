//! Space reclamation: turning selections into catalog deletions,
//! file removals, and hardlink conversions.
//!
//! # Overview
//!
//! A reclamation batch is built from a scan snapshot plus its selection
//! overlay, then executed strictly sequentially: requests never run
//! concurrently because each one may mutate both the catalog and the
//! filesystem. One failing request is recorded and the batch moves on;
//! only the final [`BatchOutcome`] says how it went overall.
//!
//! Two executors ship:
//! - [`delete::execute_deletes`]: remove the catalog record, optionally the
//!   backing file (trash for local paths, permanent for network shares)
//! - [`hardlink::execute_hardlinks`]: replace a duplicate file with a
//!   hardlink to the kept rendition, after a strict compatibility check

pub mod delete;
pub mod hardlink;

use std::path::PathBuf;

use serde::Serialize;

use crate::catalog::{MediaKind, RenditionRef};
use crate::engine::grouper::ScanSnapshot;
use crate::engine::selection::SelectionSet;

/// One rendition slated for reclamation.
#[derive(Debug, Clone)]
pub struct ReclamationRequest {
    /// Group key, used for display and logging.
    pub key: String,
    /// Movie or episode.
    pub kind: MediaKind,
    /// Backing file path as the server reports it, when known.
    pub path: Option<PathBuf>,
    /// Size in bytes (0 when unknown).
    pub size: u64,
    /// Catalog record to delete.
    pub record: RenditionRef,
    /// Path of the rendition kept in the same group; required by the
    /// hardlink executor, ignored by the delete executor.
    pub keep_path: Option<PathBuf>,
}

/// Build the request list for every rendition marked Delete.
///
/// Requests come out in snapshot order (movies first, then episodes,
/// renditions size-descending within each group), so repeated runs over the
/// same selection produce the same batch.
#[must_use]
pub fn build_requests(snapshot: &ScanSnapshot, selections: &SelectionSet) -> Vec<ReclamationRequest> {
    let mut requests = Vec::new();
    for (group, selection) in selections.iter(snapshot) {
        let keep_path = selection
            .keeps(group)
            .find_map(|(_, r)| r.path.clone());
        for (_, rendition) in selection.deletions(group) {
            requests.push(ReclamationRequest {
                key: group.key.clone(),
                kind: group.kind,
                path: rendition.path.clone(),
                size: rendition.effective_size(),
                record: rendition.record.clone(),
                keep_path: keep_path.clone(),
            });
        }
    }
    requests
}

/// How one request ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "detail")]
pub enum ItemStatus {
    /// Fully processed (or would be, in a dry run).
    Succeeded,
    /// Deliberately not processed, with the reason.
    Skipped(String),
    /// Attempted but failed, with the error.
    Failed(String),
}

/// Aggregate result of one batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchOutcome {
    /// Whether this was a dry run (no catalog or filesystem mutation).
    pub dry_run: bool,
    /// Requests in the batch.
    pub attempted: usize,
    /// Requests fully processed; in a dry run, requests that would be.
    pub succeeded: usize,
    /// Requests skipped by an eligibility check.
    pub skipped: usize,
    /// Requests that failed mid-processing.
    pub failed: usize,
    /// Bytes reclaimed (or reclaimable, in a dry run).
    pub bytes_reclaimed: u64,
    /// Per-request skip reasons, labeled by group key.
    pub skips: Vec<String>,
    /// Per-request errors, labeled by group key.
    pub errors: Vec<String>,
}

impl BatchOutcome {
    fn new(dry_run: bool, attempted: usize) -> Self {
        Self {
            dry_run,
            attempted,
            ..Self::default()
        }
    }

    fn record(&mut self, request: &ReclamationRequest, status: ItemStatus) {
        match status {
            ItemStatus::Succeeded => {
                self.succeeded += 1;
                self.bytes_reclaimed += request.size;
            }
            ItemStatus::Skipped(reason) => {
                self.skipped += 1;
                self.skips.push(format!("{}: {reason}", request.key));
            }
            ItemStatus::Failed(error) => {
                self.failed += 1;
                self.errors.push(format!("{}: {error}", request.key));
            }
        }
    }

    /// Whether the catalog or filesystem changed, so the operator should
    /// rescan before selecting anything else.
    #[must_use]
    pub fn rescan_advised(&self) -> bool {
        !self.dry_run && self.succeeded > 0
    }

    /// Whether every attempted request succeeded.
    #[must_use]
    pub fn is_complete_success(&self) -> bool {
        self.failed == 0 && self.skipped == 0
    }
}

/// Callbacks for batch progress reporting.
///
/// Implementations must be cheap; they are invoked inline between
/// sequential requests.
pub trait ReclaimProgress: Send + Sync {
    /// A request is about to be processed.
    fn on_start(&self, index: usize, total: usize, label: &str);
    /// A request finished with `status`.
    fn on_finish(&self, label: &str, status: &ItemStatus);
}

/// Progress sink that does nothing.
pub struct NoProgress;

impl ReclaimProgress for NoProgress {
    fn on_start(&self, _index: usize, _total: usize, _label: &str) {}
    fn on_finish(&self, _label: &str, _status: &ItemStatus) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Rendition, RenditionRef};
    use crate::engine::grouper::DuplicateGroup;
    use crate::engine::selection::{SelectionSet, Strategy};

    fn group(key: &str, sizes: &[u64]) -> DuplicateGroup {
        let renditions = sizes
            .iter()
            .enumerate()
            .map(|(i, size)| Rendition {
                size: Some(*size),
                resolution: None,
                codec: None,
                bitrate: None,
                path: Some(format!("/media/{key}/{i}.mkv").into()),
                record: RenditionRef {
                    item_key: key.into(),
                    media_id: i as u64,
                },
            })
            .collect();
        DuplicateGroup {
            key: key.into(),
            kind: MediaKind::Movie,
            renditions,
        }
    }

    #[test]
    fn test_requests_follow_snapshot_order() {
        let snapshot = ScanSnapshot {
            movies: vec![group("b-movie", &[300, 200]), group("a-movie", &[100, 50])],
            episodes: vec![],
            stats: Default::default(),
        };
        let selections = SelectionSet::assign_all(&snapshot, Strategy::KeepLargest, true);
        let requests = build_requests(&snapshot, &selections);

        let keys: Vec<&str> = requests.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["b-movie", "a-movie"]);
        assert_eq!(requests[0].size, 200);
        assert_eq!(requests[1].size, 50);
    }

    #[test]
    fn test_keep_path_points_at_kept_rendition() {
        let snapshot = ScanSnapshot {
            movies: vec![group("heat", &[300, 200])],
            episodes: vec![],
            stats: Default::default(),
        };
        let selections = SelectionSet::assign_all(&snapshot, Strategy::KeepSmallest, true);
        let requests = build_requests(&snapshot, &selections);

        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].size, 300);
        assert_eq!(
            requests[0].keep_path.as_deref(),
            Some(std::path::Path::new("/media/heat/1.mkv"))
        );
    }

    #[test]
    fn test_no_selection_means_no_requests() {
        let snapshot = ScanSnapshot {
            movies: vec![group("heat", &[300, 200])],
            episodes: vec![],
            stats: Default::default(),
        };
        let selections = SelectionSet::assign_all(&snapshot, Strategy::KeepLargest, false);
        assert!(build_requests(&snapshot, &selections).is_empty());
    }

    #[test]
    fn test_outcome_accounting() {
        let request = ReclamationRequest {
            key: "heat".into(),
            kind: MediaKind::Movie,
            path: None,
            size: 100,
            record: RenditionRef {
                item_key: "1".into(),
                media_id: 1,
            },
            keep_path: None,
        };
        let mut outcome = BatchOutcome::new(false, 3);
        outcome.record(&request, ItemStatus::Succeeded);
        outcome.record(&request, ItemStatus::Skipped("different sizes".into()));
        outcome.record(&request, ItemStatus::Failed("server error".into()));

        assert_eq!(outcome.succeeded, 1);
        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.failed, 1);
        assert_eq!(outcome.bytes_reclaimed, 100);
        assert!(outcome.rescan_advised());
        assert!(!outcome.is_complete_success());
        assert_eq!(outcome.skips, vec!["heat: different sizes"]);
        assert_eq!(outcome.errors, vec!["heat: server error"]);
    }

    #[test]
    fn test_dry_run_never_advises_rescan() {
        let request = ReclamationRequest {
            key: "heat".into(),
            kind: MediaKind::Movie,
            path: None,
            size: 100,
            record: RenditionRef {
                item_key: "1".into(),
                media_id: 1,
            },
            keep_path: None,
        };
        let mut outcome = BatchOutcome::new(true, 1);
        outcome.record(&request, ItemStatus::Succeeded);
        assert!(!outcome.rescan_advised());
    }
}
