//! In-memory catalog backend.
//!
//! Used by the integration tests and anywhere a catalog needs to be built
//! by hand. Failures can be injected at item and show scope to exercise the
//! grouper's error isolation, and deletions are recorded so tests can assert
//! that a dry run performed no mutations.

use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

use super::{
    CatalogClient, CatalogError, EpisodeItem, Library, MediaKind, MovieItem, RenditionRef,
    ShowItem,
};

/// A show plus its episode listing, as stored by [`MemoryCatalog`].
#[derive(Debug, Clone, Default)]
pub struct MemoryShow {
    /// Show title.
    pub title: String,
    /// Episodes; `Err` entries simulate per-episode scan failures.
    pub episodes: Vec<Result<EpisodeItem, String>>,
    /// When set, enumerating this show's episodes fails entirely.
    pub broken: bool,
}

/// In-memory [`CatalogClient`] implementation.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    movies: Vec<Result<MovieItem, String>>,
    shows: Vec<MemoryShow>,
    forbidden: bool,
    scan_delay: Option<Duration>,
    deleted: Mutex<HashSet<RenditionRef>>,
}

impl MemoryCatalog {
    /// Create an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a movie with its renditions.
    pub fn add_movie(&mut self, movie: MovieItem) {
        self.movies.push(Ok(movie));
    }

    /// Add a movie whose per-item processing fails with `message`.
    pub fn add_broken_movie(&mut self, message: &str) {
        self.movies.push(Err(message.to_string()));
    }

    /// Add a show with its episodes.
    pub fn add_show(&mut self, show: MemoryShow) {
        self.shows.push(show);
    }

    /// Make every `delete_rendition` call fail with [`CatalogError::Forbidden`].
    pub fn set_forbidden(&mut self, forbidden: bool) {
        self.forbidden = forbidden;
    }

    /// Sleep inside `libraries()` to simulate a slow server.
    pub fn set_scan_delay(&mut self, delay: Duration) {
        self.scan_delay = Some(delay);
    }

    /// Records deleted so far, in no particular order.
    #[must_use]
    pub fn deleted_records(&self) -> Vec<RenditionRef> {
        self.deleted.lock().expect("lock poisoned").iter().cloned().collect()
    }

    /// Number of records deleted so far.
    #[must_use]
    pub fn deleted_count(&self) -> usize {
        self.deleted.lock().expect("lock poisoned").len()
    }
}

impl CatalogClient for MemoryCatalog {
    fn libraries(&self) -> Result<Vec<Library>, CatalogError> {
        if let Some(delay) = self.scan_delay {
            std::thread::sleep(delay);
        }
        let mut libs = Vec::new();
        if !self.movies.is_empty() {
            libs.push(Library {
                key: "1".into(),
                title: "Movies".into(),
                kind: MediaKind::Movie,
            });
        }
        if !self.shows.is_empty() {
            libs.push(Library {
                key: "2".into(),
                title: "TV Shows".into(),
                kind: MediaKind::Show,
            });
        }
        Ok(libs)
    }

    fn movies(
        &self,
        _library: &Library,
    ) -> Result<Vec<Result<MovieItem, CatalogError>>, CatalogError> {
        Ok(self
            .movies
            .iter()
            .map(|m| m.clone().map_err(CatalogError::Api))
            .collect())
    }

    fn shows(
        &self,
        _library: &Library,
    ) -> Result<Vec<Result<ShowItem, CatalogError>>, CatalogError> {
        Ok(self
            .shows
            .iter()
            .enumerate()
            .map(|(i, s)| {
                Ok(ShowItem {
                    key: i.to_string(),
                    title: s.title.clone(),
                })
            })
            .collect())
    }

    fn episodes(
        &self,
        show: &ShowItem,
    ) -> Result<Vec<Result<EpisodeItem, CatalogError>>, CatalogError> {
        let idx: usize = show
            .key
            .parse()
            .map_err(|_| CatalogError::NotFound(show.key.clone()))?;
        let stored = self
            .shows
            .get(idx)
            .ok_or_else(|| CatalogError::NotFound(show.key.clone()))?;
        if stored.broken {
            return Err(CatalogError::Api(format!(
                "episode listing unavailable for '{}'",
                stored.title
            )));
        }
        Ok(stored
            .episodes
            .iter()
            .map(|e| e.clone().map_err(CatalogError::Api))
            .collect())
    }

    fn delete_rendition(&self, record: &RenditionRef) -> Result<(), CatalogError> {
        if self.forbidden {
            return Err(CatalogError::Forbidden);
        }
        self.deleted
            .lock()
            .expect("lock poisoned")
            .insert(record.clone());
        Ok(())
    }
}
