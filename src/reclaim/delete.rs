//! The delete executor: catalog record removal plus optional file removal.
//!
//! Catalog deletion is the authoritative step; the server stops serving the
//! rendition once its record is gone. Removing the backing file is opt-in
//! and follows the disposal rule: local files go to the OS trash so the
//! operator can recover them, files on network shares (`//` or `\\`
//! prefixes) are removed permanently because shares have no usable trash.

use std::fs;
use std::path::Path;

use crate::catalog::{CatalogClient, CatalogError};
use crate::reclaim::{BatchOutcome, ItemStatus, ReclaimProgress, ReclamationRequest};

/// Knobs for one delete batch.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeleteOptions {
    /// Report what would happen without mutating anything.
    pub dry_run: bool,
    /// Also remove the backing files, not just the catalog records.
    pub remove_files: bool,
}

/// Whether a path points at a network share.
#[must_use]
pub fn is_network_path(path: &Path) -> bool {
    let s = path.to_string_lossy();
    s.starts_with("//") || s.starts_with("\\\\")
}

/// Run a delete batch over `requests`, strictly in order.
///
/// A dry run performs no catalog or filesystem mutation and reports every
/// request as a would-be success. Otherwise each request deletes its
/// catalog record first, then optionally disposes of the file; a missing
/// file is a warning, not a failure, since the record is already gone.
pub fn execute_deletes(
    client: &dyn CatalogClient,
    requests: &[ReclamationRequest],
    options: DeleteOptions,
    progress: &dyn ReclaimProgress,
) -> BatchOutcome {
    let mut outcome = BatchOutcome::new(options.dry_run, requests.len());

    if options.dry_run {
        for request in requests {
            log::info!(
                "[DRY RUN] Would delete {} ({} bytes)",
                request.key,
                request.size
            );
            outcome.record(request, ItemStatus::Succeeded);
        }
        return outcome;
    }

    let total = requests.len();
    for (index, request) in requests.iter().enumerate() {
        progress.on_start(index, total, &request.key);
        let status = delete_one(client, request, options.remove_files);
        progress.on_finish(&request.key, &status);
        outcome.record(request, status);
    }

    outcome
}

fn delete_one(
    client: &dyn CatalogClient,
    request: &ReclamationRequest,
    remove_files: bool,
) -> ItemStatus {
    log::info!("Deleting {} rendition of {}", request.kind, request.key);

    if let Err(e) = client.delete_rendition(&request.record) {
        log::error!("Catalog deletion failed for {}: {e}", request.key);
        return ItemStatus::Failed(e.to_string());
    }

    if !remove_files {
        return ItemStatus::Succeeded;
    }

    let Some(path) = request.path.as_deref() else {
        log::warn!("No file path known for {}; record deleted only", request.key);
        return ItemStatus::Succeeded;
    };

    match dispose_file(path) {
        Ok(()) => ItemStatus::Succeeded,
        Err(DisposeError::Missing) => {
            // The record is gone either way.
            log::warn!("File already missing: {}", path.display());
            ItemStatus::Succeeded
        }
        Err(DisposeError::Other(message)) => {
            log::error!("Could not remove {}: {message}", path.display());
            ItemStatus::Failed(format!("catalog record deleted but file removal failed: {message}"))
        }
    }
}

enum DisposeError {
    Missing,
    Other(String),
}

fn dispose_file(path: &Path) -> Result<(), DisposeError> {
    if !path.exists() {
        return Err(DisposeError::Missing);
    }
    if is_network_path(path) {
        log::info!("Permanently deleting network file: {}", path.display());
        fs::remove_file(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                DisposeError::Missing
            } else {
                DisposeError::Other(e.to_string())
            }
        })
    } else {
        log::info!("Moving to trash: {}", path.display());
        trash::delete(path).map_err(|e| DisposeError::Other(e.to_string()))
    }
}
