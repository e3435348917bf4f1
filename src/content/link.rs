//! Hardlink compatibility checking.
//!
//! # Overview
//!
//! Two files may be collapsed into a hardlink only when doing so cannot
//! lose data: they must exist, live on the same device (hardlinks cannot
//! cross volumes), not already share an inode, and be byte-identical.
//! Checks run cheapest-first and short-circuit on the first failure, so a
//! cross-device pair is rejected without hashing gigabytes.
//!
//! Any internal failure (stat error, unreadable file during hashing) is
//! reported as an ineligibility reason, never propagated: an uncheckable
//! pair is an unlinkable pair.
//!
//! # Platform Support
//!
//! Device and inode identity come from Unix metadata. On platforms without
//! it the checker reports every pair ineligible rather than guessing.

use std::path::Path;

use crate::content::hash::hash_file;

/// Outcome of a compatibility check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkCheck {
    /// Whether the pair may be hardlinked.
    pub eligible: bool,
    /// Reason for ineligibility, or a short confirmation when eligible.
    pub reason: String,
}

impl LinkCheck {
    fn ok() -> Self {
        Self {
            eligible: true,
            reason: "files can be hardlinked".to_string(),
        }
    }

    fn denied(reason: &str) -> Self {
        Self {
            eligible: false,
            reason: reason.to_string(),
        }
    }
}

/// Check whether `keep` and `target` may be merged into a hardlink.
///
/// Checks, in order: both exist, same device, not already the same inode,
/// equal size, equal content digest. Only when all five pass is the pair
/// eligible. Never returns an error; failures become reasons.
#[must_use]
pub fn can_link(keep: &Path, target: &Path) -> LinkCheck {
    if !keep.exists() || !target.exists() {
        return LinkCheck::denied("missing file");
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;

        let (meta_keep, meta_target) = match (keep.metadata(), target.metadata()) {
            (Ok(a), Ok(b)) => (a, b),
            (Err(e), _) | (_, Err(e)) => {
                log::warn!("Cannot stat hardlink candidates: {e}");
                return LinkCheck::denied("missing file");
            }
        };

        if meta_keep.dev() != meta_target.dev() {
            return LinkCheck::denied("different drives/volumes");
        }

        if meta_keep.ino() == meta_target.ino() {
            return LinkCheck::denied("already hardlinked");
        }

        if meta_keep.len() != meta_target.len() {
            return LinkCheck::denied("different sizes");
        }

        if meta_keep.len() > 1 << 30 {
            log::info!(
                "Hashing large candidate pair ({} bytes), this may take a while",
                meta_keep.len()
            );
        }

        match (hash_file(keep), hash_file(target)) {
            (Ok(a), Ok(b)) if a == b => LinkCheck::ok(),
            (Ok(_), Ok(_)) => LinkCheck::denied("different content"),
            (Err(e), _) | (_, Err(e)) => {
                // Identity unknown is never identity equal.
                log::warn!("Hashing failed during compatibility check: {e}");
                LinkCheck::denied("different content")
            }
        }
    }

    #[cfg(not(unix))]
    {
        LinkCheck::denied("hardlink support unavailable on this platform")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn create_file(dir: &TempDir, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(content).unwrap();
        path
    }

    #[test]
    fn test_missing_file_denied() {
        let dir = TempDir::new().unwrap();
        let a = create_file(&dir, "a.bin", b"data");
        let missing = dir.path().join("missing.bin");

        let check = can_link(&a, &missing);
        assert!(!check.eligible);
        assert_eq!(check.reason, "missing file");

        let check = can_link(&missing, &a);
        assert!(!check.eligible);
        assert_eq!(check.reason, "missing file");
    }

    #[test]
    #[cfg(unix)]
    fn test_already_hardlinked_denied() {
        let dir = TempDir::new().unwrap();
        let a = create_file(&dir, "a.bin", b"data");
        let link = dir.path().join("link.bin");
        fs::hard_link(&a, &link).unwrap();

        let check = can_link(&a, &link);
        assert!(!check.eligible);
        assert_eq!(check.reason, "already hardlinked");
    }

    #[test]
    #[cfg(unix)]
    fn test_different_sizes_denied() {
        let dir = TempDir::new().unwrap();
        let a = create_file(&dir, "a.bin", b"short");
        let b = create_file(&dir, "b.bin", b"much longer content");

        let check = can_link(&a, &b);
        assert!(!check.eligible);
        assert_eq!(check.reason, "different sizes");
    }

    #[test]
    #[cfg(unix)]
    fn test_same_size_different_content_denied() {
        let dir = TempDir::new().unwrap();
        let a = create_file(&dir, "a.bin", b"content-A");
        let b = create_file(&dir, "b.bin", b"content-B");

        let check = can_link(&a, &b);
        assert!(!check.eligible);
        assert_eq!(check.reason, "different content");
    }

    #[test]
    #[cfg(unix)]
    fn test_identical_separate_files_eligible() {
        let dir = TempDir::new().unwrap();
        let a = create_file(&dir, "a.bin", b"identical bytes");
        let b = create_file(&dir, "b.bin", b"identical bytes");

        let check = can_link(&a, &b);
        assert!(check.eligible, "unexpected denial: {}", check.reason);
    }

    #[test]
    #[cfg(unix)]
    fn test_check_mutates_nothing() {
        let dir = TempDir::new().unwrap();
        let a = create_file(&dir, "a.bin", b"identical bytes");
        let b = create_file(&dir, "b.bin", b"identical bytes");

        let _ = can_link(&a, &b);

        use std::os::unix::fs::MetadataExt;
        assert_ne!(a.metadata().unwrap().ino(), b.metadata().unwrap().ino());
        assert_eq!(fs::read(&a).unwrap(), b"identical bytes");
        assert_eq!(fs::read(&b).unwrap(), b"identical bytes");
    }
}
