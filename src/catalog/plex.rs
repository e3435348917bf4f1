//! Plex HTTP adapter for the narrow catalog interface.
//!
//! Speaks just enough of the Plex wire protocol for the engine: list
//! sections, list the items of a section with their media rows, list a
//! show's episode leaves, and delete one media row. Responses are requested
//! as JSON; every payload is parsed defensively because servers routinely
//! omit fields (size, codec, even titles) for badly matched items.
//!
//! The engine never talks HTTP directly; it sees this adapter only through
//! [`CatalogClient`].

use std::path::PathBuf;
use std::time::Duration;

use serde_json::Value;

use super::{
    CatalogClient, CatalogError, EpisodeItem, Library, MediaKind, MovieItem, Rendition,
    RenditionRef, ShowItem,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Catalog backend for a Plex-compatible media server.
pub struct PlexCatalog {
    agent: ureq::Agent,
    base_url: String,
    token: String,
}

impl PlexCatalog {
    /// Create an adapter for `url` authenticating with `token`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::BadUrl`] when the URL is empty or lacks an
    /// http/https scheme. Connectivity is not probed here; the first
    /// request reports it.
    pub fn new(url: &str, token: &str) -> Result<Self, CatalogError> {
        let url = url.trim().trim_end_matches('/');
        if url.is_empty() {
            return Err(CatalogError::BadUrl("URL is empty".into()));
        }
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(CatalogError::BadUrl(format!(
                "'{url}' must start with http:// or https://"
            )));
        }
        let agent = ureq::AgentBuilder::new()
            .timeout(REQUEST_TIMEOUT)
            .build();
        Ok(Self {
            agent,
            base_url: url.to_string(),
            token: token.to_string(),
        })
    }

    fn get_json(&self, path: &str) -> Result<Value, CatalogError> {
        let url = format!("{}{}", self.base_url, path);
        log::debug!("GET {url}");
        let response = self
            .agent
            .get(&url)
            .set("Accept", "application/json")
            .set("X-Plex-Token", &self.token)
            .call()
            .map_err(map_ureq_error)?;
        response
            .into_json::<Value>()
            .map_err(|e| CatalogError::Api(format!("invalid JSON from server: {e}")))
    }

    fn items_of(&self, path: &str) -> Result<Vec<Value>, CatalogError> {
        let body = self.get_json(path)?;
        let metadata = body
            .pointer("/MediaContainer/Metadata")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        Ok(metadata)
    }
}

fn map_ureq_error(err: ureq::Error) -> CatalogError {
    match err {
        ureq::Error::Status(401, _) => CatalogError::Unauthorized,
        ureq::Error::Status(403, _) => CatalogError::Forbidden,
        ureq::Error::Status(404, _) => CatalogError::NotFound("resource not found".into()),
        ureq::Error::Status(code, _) => CatalogError::Api(format!("HTTP {code}")),
        ureq::Error::Transport(t) => CatalogError::Connect(t.to_string()),
    }
}

/// Parse one Media row into a [`Rendition`].
///
/// Size resolution order: the media-level `size`, else the sum of its part
/// sizes, else unknown. Absent fields stay `None`.
fn parse_rendition(item_key: &str, media: &Value) -> Option<Rendition> {
    let media_id = media.get("id").and_then(Value::as_u64)?;

    let parts = media.get("Part").and_then(Value::as_array);
    let media_size = media.get("size").and_then(Value::as_u64).filter(|s| *s > 0);
    let size = media_size.or_else(|| {
        let total: u64 = parts
            .into_iter()
            .flatten()
            .filter_map(|p| p.get("size").and_then(Value::as_u64))
            .sum();
        (total > 0).then_some(total)
    });

    let path = media
        .get("Part")
        .and_then(Value::as_array)
        .and_then(|parts| parts.first())
        .and_then(|p| p.get("file"))
        .and_then(Value::as_str)
        .map(PathBuf::from);

    Some(Rendition {
        size,
        resolution: media
            .get("videoResolution")
            .and_then(Value::as_str)
            .map(str::to_string),
        codec: media
            .get("videoCodec")
            .and_then(Value::as_str)
            .map(str::to_string),
        bitrate: media.get("bitrate").and_then(Value::as_u64),
        path,
        record: RenditionRef {
            item_key: item_key.to_string(),
            media_id,
        },
    })
}

fn parse_renditions(metadata: &Value) -> Result<Vec<Rendition>, CatalogError> {
    let item_key = metadata
        .get("ratingKey")
        .and_then(Value::as_str)
        .ok_or_else(|| CatalogError::Api("item missing ratingKey".into()))?;
    Ok(metadata
        .get("Media")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|m| parse_rendition(item_key, m))
        .collect())
}

fn parse_movie(metadata: &Value) -> Result<MovieItem, CatalogError> {
    let title = metadata
        .get("title")
        .and_then(Value::as_str)
        .ok_or_else(|| CatalogError::Api("movie missing title".into()))?;
    Ok(MovieItem {
        title: title.to_string(),
        renditions: parse_renditions(metadata)?,
    })
}

fn parse_show(metadata: &Value) -> Result<ShowItem, CatalogError> {
    let key = metadata
        .get("ratingKey")
        .and_then(Value::as_str)
        .ok_or_else(|| CatalogError::Api("show missing ratingKey".into()))?;
    let title = metadata
        .get("title")
        .and_then(Value::as_str)
        .map_or_else(|| format!("Unknown Show (ID: {key})"), str::to_string);
    Ok(ShowItem {
        key: key.to_string(),
        title,
    })
}

fn parse_episode(metadata: &Value) -> Result<EpisodeItem, CatalogError> {
    Ok(EpisodeItem {
        season: metadata
            .get("parentIndex")
            .and_then(Value::as_u64)
            .map(|n| n as u32),
        episode: metadata
            .get("index")
            .and_then(Value::as_u64)
            .map(|n| n as u32),
        title: metadata
            .get("title")
            .and_then(Value::as_str)
            .map(str::to_string),
        renditions: parse_renditions(metadata)?,
    })
}

impl CatalogClient for PlexCatalog {
    fn libraries(&self) -> Result<Vec<Library>, CatalogError> {
        let body = self.get_json("/library/sections")?;
        let sections = body
            .pointer("/MediaContainer/Directory")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let mut libraries = Vec::new();
        for section in &sections {
            let kind = match section.get("type").and_then(Value::as_str) {
                Some("movie") => MediaKind::Movie,
                Some("show") => MediaKind::Show,
                other => {
                    log::debug!("Skipping library of type {other:?}");
                    continue;
                }
            };
            let (Some(key), Some(title)) = (
                section.get("key").and_then(section_key),
                section.get("title").and_then(Value::as_str),
            ) else {
                log::warn!("Skipping library section with missing key or title");
                continue;
            };
            libraries.push(Library {
                key,
                title: title.to_string(),
                kind,
            });
        }
        Ok(libraries)
    }

    fn movies(
        &self,
        library: &Library,
    ) -> Result<Vec<Result<MovieItem, CatalogError>>, CatalogError> {
        let items = self.items_of(&format!("/library/sections/{}/all", library.key))?;
        Ok(items.iter().map(parse_movie).collect())
    }

    fn shows(
        &self,
        library: &Library,
    ) -> Result<Vec<Result<ShowItem, CatalogError>>, CatalogError> {
        let items = self.items_of(&format!("/library/sections/{}/all", library.key))?;
        Ok(items.iter().map(parse_show).collect())
    }

    fn episodes(
        &self,
        show: &ShowItem,
    ) -> Result<Vec<Result<EpisodeItem, CatalogError>>, CatalogError> {
        let items = self.items_of(&format!("/library/metadata/{}/allLeaves", show.key))?;
        Ok(items.iter().map(parse_episode).collect())
    }

    fn delete_rendition(&self, record: &RenditionRef) -> Result<(), CatalogError> {
        let url = format!(
            "{}/library/metadata/{}/media/{}",
            self.base_url, record.item_key, record.media_id
        );
        log::info!("DELETE {url}");
        self.agent
            .delete(&url)
            .set("Accept", "application/json")
            .set("X-Plex-Token", &self.token)
            .call()
            .map_err(map_ureq_error)?;
        Ok(())
    }
}

/// Section keys arrive as strings or numbers depending on server version.
fn section_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
