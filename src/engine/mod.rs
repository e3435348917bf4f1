//! Engine: scan and batch orchestration.
//!
//! # Overview
//!
//! The engine runs at most one operation at a time. A scan or a batch is
//! started on a background thread and its result handed back over a
//! channel; while one is running, further start calls fail fast with
//! [`EngineError::Busy`] instead of queueing. Results are immutable
//! snapshots, so the caller's view never changes underneath it; a batch is
//! followed by a fresh scan, not by patching the old snapshot.
//!
//! Batches run strictly sequentially within their thread and cannot be
//! cancelled mid-flight: every request either completes or fails on its
//! own, and the outcome reports which.

pub mod grouper;
pub mod selection;

pub use grouper::{episode_key, scan, DuplicateGroup, ScanSnapshot, ScanStats};
pub use selection::{assign, GroupSelection, SelectionSet, SelectionState, Strategy};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread;

use crate::catalog::{CatalogClient, CatalogError};
use crate::reclaim::delete::{execute_deletes, DeleteOptions};
use crate::reclaim::hardlink::execute_hardlinks;
use crate::reclaim::{BatchOutcome, ReclaimProgress, ReclamationRequest};

/// Errors from the engine itself (operation results travel the channel).
#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    /// A scan or batch is already running.
    #[error("another operation is already in progress")]
    Busy,
}

/// What a batch should do with its requests.
pub enum BatchSpec {
    /// Delete catalog records, optionally removing the backing files.
    Delete {
        /// Renditions to delete.
        requests: Vec<ReclamationRequest>,
        /// Dry-run and file-removal knobs.
        options: DeleteOptions,
    },
    /// Convert duplicates into hardlinks to their kept rendition.
    Hardlink {
        /// Renditions to convert.
        requests: Vec<ReclamationRequest>,
        /// Report without mutating; the compatibility check still runs.
        dry_run: bool,
    },
}

impl BatchSpec {
    /// Number of requests in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            BatchSpec::Delete { requests, .. } | BatchSpec::Hardlink { requests, .. } => {
                requests.len()
            }
        }
    }

    /// Whether the batch has no requests.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// Released on drop so a panicking worker never wedges the engine.
struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Single-operation orchestrator over one catalog client.
pub struct Engine {
    client: Arc<dyn CatalogClient>,
    busy: Arc<AtomicBool>,
}

impl Engine {
    /// Create an engine over `client`.
    #[must_use]
    pub fn new(client: Arc<dyn CatalogClient>) -> Self {
        Self {
            client,
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether a scan or batch is currently running.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    fn acquire(&self) -> Result<BusyGuard, EngineError> {
        self.busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| EngineError::Busy)?;
        Ok(BusyGuard(Arc::clone(&self.busy)))
    }

    /// Start a scan on a background thread.
    ///
    /// The receiver yields exactly one message: the snapshot or the fatal
    /// connectivity error that aborted the scan.
    ///
    /// # Errors
    ///
    /// [`EngineError::Busy`] when another operation is running.
    pub fn start_scan(&self) -> Result<Receiver<Result<ScanSnapshot, CatalogError>>, EngineError> {
        let guard = self.acquire()?;
        let client = Arc::clone(&self.client);
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let result = scan(client.as_ref());
            drop(guard);
            // A dropped receiver just means nobody wants the result.
            let _ = tx.send(result);
        });

        Ok(rx)
    }

    /// Start a batch on a background thread.
    ///
    /// The receiver yields exactly one [`BatchOutcome`]. Requests run in
    /// order; there is no mid-batch cancellation.
    ///
    /// # Errors
    ///
    /// [`EngineError::Busy`] when another operation is running.
    pub fn start_batch(
        &self,
        spec: BatchSpec,
        progress: Arc<dyn ReclaimProgress>,
    ) -> Result<Receiver<BatchOutcome>, EngineError> {
        let guard = self.acquire()?;
        let client = Arc::clone(&self.client);
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let outcome = match spec {
                BatchSpec::Delete { requests, options } => {
                    execute_deletes(client.as_ref(), &requests, options, progress.as_ref())
                }
                BatchSpec::Hardlink { requests, dry_run } => {
                    execute_hardlinks(client.as_ref(), &requests, dry_run, progress.as_ref())
                }
            };
            drop(guard);
            let _ = tx.send(outcome);
        });

        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::memory::MemoryCatalog;
    use crate::catalog::{MovieItem, Rendition, RenditionRef};
    use crate::reclaim::{build_requests, NoProgress};
    use std::time::Duration;

    fn movie(title: &str, sizes: &[u64]) -> MovieItem {
        MovieItem {
            title: title.into(),
            renditions: sizes
                .iter()
                .enumerate()
                .map(|(i, size)| Rendition {
                    size: Some(*size),
                    resolution: None,
                    codec: None,
                    bitrate: None,
                    path: None,
                    record: RenditionRef {
                        item_key: title.into(),
                        media_id: i as u64,
                    },
                })
                .collect(),
        }
    }

    #[test]
    fn test_scan_hands_back_a_snapshot() {
        let mut catalog = MemoryCatalog::new();
        catalog.add_movie(movie("Heat", &[200, 100]));
        let engine = Engine::new(Arc::new(catalog));

        let rx = engine.start_scan().unwrap();
        let snapshot = rx.recv().unwrap().unwrap();

        assert_eq!(snapshot.group_count(), 1);
        assert!(!engine.is_busy());
    }

    #[test]
    fn test_second_scan_while_busy_is_rejected() {
        let mut catalog = MemoryCatalog::new();
        catalog.add_movie(movie("Heat", &[200, 100]));
        catalog.set_scan_delay(Duration::from_millis(200));
        let engine = Engine::new(Arc::new(catalog));

        let rx = engine.start_scan().unwrap();
        assert!(matches!(engine.start_scan(), Err(EngineError::Busy)));

        let _ = rx.recv().unwrap();
        // The worker released the engine before sending the result.
        assert!(engine.start_scan().is_ok());
    }

    #[test]
    fn test_scan_then_batch_end_to_end() {
        let mut catalog = MemoryCatalog::new();
        catalog.add_movie(movie("Heat", &[200, 100]));
        catalog.add_movie(movie("Alien", &[400, 300]));
        let catalog = Arc::new(catalog);
        let engine = Engine::new(Arc::clone(&catalog) as Arc<dyn CatalogClient>);

        let snapshot = engine.start_scan().unwrap().recv().unwrap().unwrap();
        let selections = SelectionSet::assign_all(&snapshot, Strategy::KeepLargest, true);
        let requests = build_requests(&snapshot, &selections);

        let rx = engine
            .start_batch(
                BatchSpec::Delete {
                    requests,
                    options: DeleteOptions::default(),
                },
                Arc::new(NoProgress),
            )
            .unwrap();
        let outcome = rx.recv().unwrap();

        assert_eq!(outcome.succeeded, 2);
        assert_eq!(outcome.bytes_reclaimed, 400);
        assert_eq!(catalog.deleted_count(), 2);
        assert!(!engine.is_busy());
    }

    #[test]
    fn test_dry_run_batch_leaves_catalog_untouched() {
        let mut catalog = MemoryCatalog::new();
        catalog.add_movie(movie("Heat", &[200, 100]));
        let catalog = Arc::new(catalog);
        let engine = Engine::new(Arc::clone(&catalog) as Arc<dyn CatalogClient>);

        let snapshot = engine.start_scan().unwrap().recv().unwrap().unwrap();
        let selections = SelectionSet::assign_all(&snapshot, Strategy::KeepLargest, true);
        let requests = build_requests(&snapshot, &selections);

        let outcome = engine
            .start_batch(
                BatchSpec::Delete {
                    requests,
                    options: DeleteOptions {
                        dry_run: true,
                        remove_files: false,
                    },
                },
                Arc::new(NoProgress),
            )
            .unwrap()
            .recv()
            .unwrap();

        assert!(outcome.dry_run);
        assert_eq!(outcome.bytes_reclaimed, 100);
        assert_eq!(catalog.deleted_count(), 0);
    }

    #[test]
    fn test_batch_spec_len() {
        let spec = BatchSpec::Hardlink {
            requests: vec![],
            dry_run: true,
        };
        assert!(spec.is_empty());
        assert_eq!(spec.len(), 0);
    }
}
