//! Streaming SHA-256 file hashing.
//!
//! # Overview
//!
//! Computes a content digest by reading the file in fixed-size chunks, so
//! memory use stays constant no matter how large the file is (media files
//! routinely run tens of gigabytes). The chunk size only affects I/O
//! efficiency; the digest is a pure function of the file's bytes.
//!
//! A failed hash means "content identity unknown". Callers must never treat
//! two files as equal because both hashes failed.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use sha2::{Digest as _, Sha256};

/// Default read chunk size (64 KiB).
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// A 256-bit content digest.
pub type Digest = [u8; 32];

/// Errors that can occur while hashing a file.
#[derive(thiserror::Error, Debug)]
pub enum HashError {
    /// The specified file was not found.
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    /// Permission was denied when reading the file.
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// An I/O error occurred while reading the file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl HashError {
    fn from_io(path: &Path, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => HashError::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => HashError::PermissionDenied(path.to_path_buf()),
            _ => HashError::Io {
                path: path.to_path_buf(),
                source: err,
            },
        }
    }
}

/// Hash the full content of `path` with the default chunk size.
///
/// # Errors
///
/// Returns a [`HashError`] on missing file, permission error, or I/O
/// failure. The caller must treat the content identity as unknown.
pub fn hash_file(path: &Path) -> Result<Digest, HashError> {
    hash_file_chunked(path, DEFAULT_CHUNK_SIZE)
}

/// Hash the full content of `path`, reading `chunk_size` bytes at a time.
///
/// The digest is identical for any `chunk_size`; exposed separately so
/// tests can prove it and callers can tune I/O.
///
/// # Errors
///
/// Same as [`hash_file`].
pub fn hash_file_chunked(path: &Path, chunk_size: usize) -> Result<Digest, HashError> {
    let mut file = File::open(path).map_err(|e| HashError::from_io(path, e))?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; chunk_size.max(1)];

    loop {
        let read = file
            .read(&mut buffer)
            .map_err(|e| HashError::from_io(path, e))?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(hasher.finalize().into())
}

/// Render a digest as a lowercase hex string.
#[must_use]
pub fn digest_to_hex(digest: &Digest) -> String {
    digest.iter().map(|b| format!("{b:02x}")).collect()
}
