//! Media catalog data model and client abstraction.
//!
//! # Overview
//!
//! The catalog is the remote media server's view of the world: libraries
//! containing movies or shows, items containing one or more *renditions*
//! (physical files backing the same logical title). The engine only needs a
//! narrow slice of that surface, captured by the [`CatalogClient`] trait:
//! enumerate libraries, enumerate items with their renditions, and delete a
//! single rendition record.
//!
//! Two implementations ship with the crate:
//! - [`plex::PlexCatalog`]: HTTP adapter for a Plex-compatible server
//! - [`memory::MemoryCatalog`]: in-memory catalog for tests and offline use
//!
//! Metadata a server may or may not report (size, resolution, codec, file
//! path) is modeled as `Option<T>`, never as sentinel strings. Missing
//! metadata must never crash a scan; size-dependent logic treats `None` and
//! `Some(0)` as "unknown".

pub mod memory;
pub mod plex;

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Whether a library holds movies or TV shows.
///
/// Libraries of any other type (music, photos) are skipped during scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaKind {
    /// A movie library; items are standalone titles.
    Movie,
    /// A TV library; items are shows containing episodes.
    Show,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Movie => write!(f, "Movie"),
            MediaKind::Show => write!(f, "TV Episode"),
        }
    }
}

/// A library section on the media server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Library {
    /// Server-side section key.
    pub key: String,
    /// Display title of the library.
    pub title: String,
    /// What the library holds.
    pub kind: MediaKind,
}

/// Opaque handle used to delete one rendition record from the catalog.
///
/// For the Plex backend this is the metadata rating key plus the media row
/// id; the memory backend uses the same two fields as plain identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RenditionRef {
    /// Rating key of the owning item (movie or episode).
    pub item_key: String,
    /// Id of the media row within the item.
    pub media_id: u64,
}

impl fmt::Display for RenditionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.item_key, self.media_id)
    }
}

/// One physical file backing a logical media item.
///
/// An immutable snapshot taken during a scan; discarded on the next scan.
/// Every metadata field the server might omit is optional.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rendition {
    /// Size in bytes as reported by the server; `None` or `Some(0)` means
    /// unknown and is treated as 0 in size-dependent logic.
    pub size: Option<u64>,
    /// Video resolution label (e.g. "1080", "4k").
    pub resolution: Option<String>,
    /// Video codec label (e.g. "h264", "hevc").
    pub codec: Option<String>,
    /// Bitrate in kbps.
    pub bitrate: Option<u64>,
    /// Absolute path of the backing file as the server sees it.
    pub path: Option<PathBuf>,
    /// Handle for deleting this rendition's catalog record.
    pub record: RenditionRef,
}

impl Rendition {
    /// Effective size for sorting and space estimates: 0 when unknown.
    #[must_use]
    pub fn effective_size(&self) -> u64 {
        self.size.unwrap_or(0)
    }

    /// Whether the server reported a usable size.
    #[must_use]
    pub fn size_known(&self) -> bool {
        self.effective_size() > 0
    }

    /// Resolution for display, `"Unknown"` when absent.
    #[must_use]
    pub fn resolution_label(&self) -> &str {
        self.resolution.as_deref().unwrap_or("Unknown")
    }

    /// Codec for display, `"Unknown"` when absent.
    #[must_use]
    pub fn codec_label(&self) -> &str {
        self.codec.as_deref().unwrap_or("Unknown")
    }
}

/// A movie item together with its renditions.
#[derive(Debug, Clone)]
pub struct MovieItem {
    /// Movie title; also the grouping key.
    pub title: String,
    /// Renditions in server enumeration order.
    pub renditions: Vec<Rendition>,
}

/// A show item; episodes are fetched separately.
#[derive(Debug, Clone)]
pub struct ShowItem {
    /// Server-side rating key of the show.
    pub key: String,
    /// Show title, or a fallback label if the server omitted one.
    pub title: String,
}

/// One episode of a show together with its renditions.
#[derive(Debug, Clone)]
pub struct EpisodeItem {
    /// Season number when known.
    pub season: Option<u32>,
    /// Episode number when known.
    pub episode: Option<u32>,
    /// Episode title when known.
    pub title: Option<String>,
    /// Renditions in server enumeration order.
    pub renditions: Vec<Rendition>,
}

/// Errors reported by catalog backends.
///
/// Connectivity-class variants (`Connect`, `Unauthorized`, `BadUrl`) are
/// fatal to a scan and reported once at scan start. `Forbidden` is the
/// distinguished per-item permission error: the server refuses deletion
/// until "Allow media deletion" is enabled in its settings.
#[derive(thiserror::Error, Debug)]
pub enum CatalogError {
    /// Server unreachable or transport failure.
    #[error("cannot reach media server: {0}")]
    Connect(String),

    /// The token was rejected.
    #[error("authentication failed - check the server token")]
    Unauthorized,

    /// The server URL could not be parsed.
    #[error("malformed server URL: {0}")]
    BadUrl(String),

    /// Deletion not permitted by server configuration.
    #[error("deletion not permitted by server configuration (enable \"Allow media deletion\")")]
    Forbidden,

    /// The referenced record no longer exists.
    #[error("catalog record not found: {0}")]
    NotFound(String),

    /// Any other server-reported failure.
    #[error("media server error: {0}")]
    Api(String),
}

impl CatalogError {
    /// Whether this error aborts a whole scan rather than one item.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CatalogError::Connect(_) | CatalogError::Unauthorized | CatalogError::BadUrl(_)
        )
    }
}

/// Narrow catalog interface consumed by the engine.
///
/// Per-item calls return `Result` so one unreadable show or episode never
/// aborts a scan; the grouper folds failures into its stats.
pub trait CatalogClient: Send + Sync {
    /// List all library sections of interest (movie and show types only).
    fn libraries(&self) -> Result<Vec<Library>, CatalogError>;

    /// List the movies of a movie library, each with its renditions.
    fn movies(&self, library: &Library) -> Result<Vec<Result<MovieItem, CatalogError>>, CatalogError>;

    /// List the shows of a TV library.
    fn shows(&self, library: &Library) -> Result<Vec<Result<ShowItem, CatalogError>>, CatalogError>;

    /// List the episodes of one show, each with its renditions.
    fn episodes(&self, show: &ShowItem) -> Result<Vec<Result<EpisodeItem, CatalogError>>, CatalogError>;

    /// Delete one rendition record from the catalog.
    fn delete_rendition(&self, record: &RenditionRef) -> Result<(), CatalogError>;
}
