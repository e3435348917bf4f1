//! Content identity: file hashing and hardlink eligibility.
//!
//! The hardlink pipeline must never merge two files that are not
//! byte-identical, so identity is established with a full-content digest
//! and a stat-level compatibility check:
//! - [`hash`]: streaming SHA-256 over file content
//! - [`link`]: the five-step hardlink compatibility checker

pub mod hash;
pub mod link;

pub use hash::{digest_to_hex, hash_file, hash_file_chunked, Digest, HashError, DEFAULT_CHUNK_SIZE};
pub use link::{can_link, LinkCheck};
