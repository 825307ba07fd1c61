//!
//! src/platform.rs  Oct 16th, 2026
//!
//! Platform adapters: turn Spotify track objects and Apple Music ids
//! into the resolver's TrackInput.
//!

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::ResolverError;
use crate::fetch::AppleMusicClient;
use crate::types::TrackInput;

const UNKNOWN_ARTIST: &str = "Unknown Artist";
const ARTWORK_SIZE: &str = "300";

/// Subset of a Spotify track object that matters for resolution
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyTrack {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<SpotifyArtist>,
    pub album: Option<SpotifyAlbum>,
    pub duration_ms: Option<u64>,
    pub external_ids: Option<SpotifyExternalIds>
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyArtist {
    pub name: String
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyAlbum {
    pub name: String
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyExternalIds {
    pub isrc: Option<String>
}

impl From<SpotifyTrack> for TrackInput {
    fn from(t: SpotifyTrack) -> Self {
        let artist_name = t.artists.into_iter()
            .next()
            .map(|a| a.name)
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| UNKNOWN_ARTIST.to_string());

        TrackInput {
            source_id: t.id,
            name: t.name,
            artist_name,
            isrc: t.external_ids.and_then(|e| e.isrc),
            album_name: t.album.map(|a| a.name),
            duration_in_millis: t.duration_ms,
            artwork_url: None
        }
    }
}

/// Apple Music api `{ data: [...] }` envelope for songs
#[derive(Debug, Deserialize)]
pub struct AppleSongs {
    #[serde(default)]
    pub data: Vec<AppleSong>
}

#[derive(Debug, Deserialize)]
pub struct AppleSong {
    pub id: Option<String>,
    pub attributes: Option<AppleSongAttributes>,
    pub relationships: Option<AppleRelationships>
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppleSongAttributes {
    pub name: Option<String>,
    pub artist_name: Option<String>,
    pub album_name: Option<String>,
    pub duration_in_millis: Option<u64>,
    pub isrc: Option<String>,
    pub artwork: Option<AppleArtwork>,
    pub play_params: Option<ApplePlayParams>
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppleArtwork {
    pub url: Option<String>
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplePlayParams {
    pub catalog_id: Option<String>
}

#[derive(Debug, Deserialize)]
pub struct AppleRelationships {
    pub catalog: Option<AppleSongs>
}

/// Result of looking one Apple id up in the catalog
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedTrack {
    pub id: String,
    pub isrc: Option<String>,
    pub catalog_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_in_millis: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artwork_url: Option<String>
}

impl EnrichedTrack {
    fn bare(id: &str, catalog_id: Option<String>) -> Self {
        Self { id: id.to_string(), catalog_id, ..Default::default() }
    }

    /// Fills descriptive fields, keeping any already set
    fn describe(&mut self, attrs: &AppleSongAttributes) {
        fn fill<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
            if slot.is_none() {
                *slot = value.clone();
            }
        }
        fill(&mut self.name, &attrs.name);
        fill(&mut self.artist_name, &attrs.artist_name);
        fill(&mut self.album_name, &attrs.album_name);
        fill(&mut self.duration_in_millis, &attrs.duration_in_millis);
        if self.artwork_url.is_none() {
            self.artwork_url = attrs.artwork.as_ref()
                .and_then(|a| a.url.as_deref())
                .map(|u| u.replace("{w}", ARTWORK_SIZE).replace("{h}", ARTWORK_SIZE));
        }
    }

    pub fn to_track_input(&self) -> TrackInput {
        TrackInput {
            source_id: self.id.clone(),
            name: self.name.clone().unwrap_or_default(),
            artist_name: self.artist_name.clone().unwrap_or_default(),
            isrc: self.isrc.clone(),
            album_name: self.album_name.clone(),
            duration_in_millis: self.duration_in_millis,
            artwork_url: self.artwork_url.clone()
        }
    }
}

/// Apple sometimes sends `""` for a missing isrc
fn non_empty(value: &Option<String>) -> Option<String> {
    value.clone().filter(|s| !s.trim().is_empty())
}

/// Library ids are user scoped and need the catalog relationship resolved
pub fn is_library_id(id: &str) -> bool {
    id.starts_with("i.") || id.starts_with("l.")
}

#[derive(Clone, Debug)]
pub struct AppleCatalog {
    client: AppleMusicClient
}

impl AppleCatalog {
    pub fn new(client: AppleMusicClient) -> Self {
        Self { client }
    }

    pub fn developer_token(&self) -> Option<&str> {
        self.client.cfg.developer_token.as_deref()
    }

    /// Looks every id up, a chunk at a time. Output matches input order and
    /// length; an id that cannot be fetched comes back without an ISRC.
    pub async fn enrich(&self, ids: &[String], developer_token: &str, user_token: &str) ->
        Vec<EnrichedTrack> {
        let mut out = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(self.client.cfg.batch_size.max(1)) {
            let lookups = chunk.iter().map(|id| async move {
                match self.enrich_one(id, developer_token, user_token).await {
                    Ok(track) => track,
                    Err(e) => {
                        warn!(id = %id, error = %e, "apple.enrich.error");
                        EnrichedTrack::bare(id, None)
                    }
                }
            });
            out.extend(join_all(lookups).await);
        }
        out
    }

    async fn enrich_one(&self, id: &str, developer_token: &str, user_token: &str) ->
        Result<EnrichedTrack, ResolverError> {
        if is_library_id(id) {
            self.enrich_library(id, developer_token, user_token).await
        } else {
            self.enrich_catalog(id, developer_token, user_token).await
        }
    }

    async fn fetch_songs(&self, request: reqwest::RequestBuilder) ->
        Result<Option<AppleSongs>, ResolverError> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            debug!(status = status.as_u16(), "apple.fetch.status");
            return Ok(None);
        }
        let body = response.bytes().await?;
        Ok(Some(serde_json::from_slice::<AppleSongs>(&body)?))
    }

    async fn enrich_library(&self, id: &str, developer_token: &str, user_token: &str) ->
        Result<EnrichedTrack, ResolverError> {
        let request = self.client.library_song(id, developer_token, user_token)?;
        let Some(song) = self.fetch_songs(request).await?
            .and_then(|s| s.data.into_iter().next()) else {
            return Ok(EnrichedTrack::bare(id, None));
        };

        let library_attrs = song.attributes.unwrap_or_default();
        let catalog_song = song.relationships
            .and_then(|r| r.catalog)
            .and_then(|c| c.data.into_iter().next());

        let mut track = match catalog_song {
            Some(catalog) => {
                let attrs = catalog.attributes.unwrap_or_default();
                let mut track = EnrichedTrack::bare(id, catalog.id);
                track.isrc = non_empty(&attrs.isrc);
                track.describe(&attrs);
                track
            }
            None => {
                let catalog_id = library_attrs.play_params.as_ref()
                    .and_then(|p| p.catalog_id.clone());
                EnrichedTrack::bare(id, catalog_id)
            }
        };
        track.describe(&library_attrs);
        Ok(track)
    }

    async fn enrich_catalog(&self, id: &str, developer_token: &str, user_token: &str) ->
        Result<EnrichedTrack, ResolverError> {
        let request = self.client.catalog_song(id, developer_token, user_token)?;
        let mut track = EnrichedTrack::bare(id, Some(id.to_string()));

        let song = self.fetch_songs(request).await?
            .and_then(|s| s.data.into_iter().next());
        if let Some(attrs) = song.and_then(|s| s.attributes) {
            track.isrc = non_empty(&attrs.isrc);
            track.describe(&attrs);
        }
        Ok(track)
    }
}
