//! The hardlink executor: collapse a duplicate file into a link to the
//! kept rendition, reclaiming its space without losing a catalog entry's
//! playable file.
//!
//! Per request the pipeline is: compatibility check, catalog record
//! deletion, then the filesystem conversion. The conversion itself is
//! rollback-safe: the duplicate is moved aside to a backup first, and if
//! link creation fails the backup is moved back so the file is exactly
//! where it started. The backup is removed only after the link exists.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::catalog::CatalogClient;
use crate::content::can_link;
use crate::reclaim::{BatchOutcome, ItemStatus, ReclaimProgress, ReclamationRequest};

/// Suffix appended to the duplicate while the link is being created.
pub const BACKUP_SUFFIX: &str = ".mediasweep_backup";

/// Failure modes of one conversion.
#[derive(thiserror::Error, Debug)]
pub enum HardlinkError {
    /// The duplicate could not be moved aside; nothing was changed.
    #[error("could not move file to backup: {0}")]
    Backup(#[source] io::Error),

    /// Link creation failed and the duplicate was restored from backup.
    #[error("link creation failed ({source}); original file restored")]
    LinkRestored {
        /// The link error.
        #[source]
        source: io::Error,
    },

    /// Link creation failed and the restore also failed; the file content
    /// survives at the backup path.
    #[error("link creation failed ({source}) and restore failed ({restore}); file preserved at {}", backup.display())]
    LinkUnrestored {
        /// The link error.
        source: io::Error,
        /// The restore error.
        restore: io::Error,
        /// Where the original content still lives.
        backup: PathBuf,
    },
}

fn backup_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_os_string();
    name.push(BACKUP_SUFFIX);
    PathBuf::from(name)
}

/// Replace `target` with a hardlink to `keep`.
///
/// Assumes [`can_link`] already passed. On success `target` and `keep`
/// share an inode and the backup is gone; a leftover backup after a failed
/// cleanup is logged, never fatal, because the link itself is in place.
///
/// # Errors
///
/// See [`HardlinkError`]; in every error case the original file content is
/// still on disk, either at `target` or at the reported backup path.
pub fn convert_to_hardlink(keep: &Path, target: &Path) -> Result<(), HardlinkError> {
    let backup = backup_path(target);

    fs::rename(target, &backup).map_err(HardlinkError::Backup)?;

    if let Err(link_err) = fs::hard_link(keep, target) {
        return match fs::rename(&backup, target) {
            Ok(()) => Err(HardlinkError::LinkRestored { source: link_err }),
            Err(restore_err) => Err(HardlinkError::LinkUnrestored {
                source: link_err,
                restore: restore_err,
                backup,
            }),
        };
    }

    if let Err(e) = fs::remove_file(&backup) {
        log::warn!(
            "Link created but backup not removed ({e}): {}",
            backup.display()
        );
    }

    Ok(())
}

/// Run a hardlink batch over `requests`, strictly in order.
///
/// Every request runs the compatibility check, dry run or not, so a dry
/// run predicts the real outcome. Ineligible pairs are skipped with the
/// checker's reason; a catalog deletion failure leaves the filesystem
/// untouched for that request.
pub fn execute_hardlinks(
    client: &dyn CatalogClient,
    requests: &[ReclamationRequest],
    dry_run: bool,
    progress: &dyn ReclaimProgress,
) -> BatchOutcome {
    let mut outcome = BatchOutcome::new(dry_run, requests.len());
    let total = requests.len();

    for (index, request) in requests.iter().enumerate() {
        progress.on_start(index, total, &request.key);
        let status = hardlink_one(client, request, dry_run);
        progress.on_finish(&request.key, &status);
        outcome.record(request, status);
    }

    outcome
}

fn hardlink_one(
    client: &dyn CatalogClient,
    request: &ReclamationRequest,
    dry_run: bool,
) -> ItemStatus {
    let (Some(keep), Some(target)) = (request.keep_path.as_deref(), request.path.as_deref())
    else {
        return ItemStatus::Skipped("missing file".to_string());
    };

    let check = can_link(keep, target);
    if !check.eligible {
        log::info!("Skipping {} for hardlink: {}", request.key, check.reason);
        return ItemStatus::Skipped(check.reason);
    }

    if dry_run {
        log::info!(
            "[DRY RUN] Would hardlink {} to {}",
            target.display(),
            keep.display()
        );
        return ItemStatus::Succeeded;
    }

    if let Err(e) = client.delete_rendition(&request.record) {
        log::error!("Catalog deletion failed for {}: {e}", request.key);
        return ItemStatus::Failed(e.to_string());
    }

    log::info!("Hardlinking {} -> {}", target.display(), keep.display());
    match convert_to_hardlink(keep, target) {
        Ok(()) => ItemStatus::Succeeded,
        Err(e) => {
            log::error!("Hardlink conversion failed for {}: {e}", request.key);
            ItemStatus::Failed(e.to_string())
        }
    }
}
