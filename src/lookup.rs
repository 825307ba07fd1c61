//!
//! src/lookup.rs  Oct 16th, 2026
//!
//! Recording lookup strategies against musicbrainz: exact ISRC lookup
//! and lucene text search. Both go through the shared rate gate and
//! return a normalized recording or nothing.
//!

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use crate::config::MusicBrainzConfig;
use crate::errors::ResolverError;
use crate::fetch::MusicBrainzClient;
use crate::rate::RateGate;
use crate::types::RecordingMatch;

/// The two strategies the resolver can try. `Ok(None)` is a confirmed
/// absence, `Err` is a failed attempt.
#[async_trait]
pub trait RecordingLookup: Send + Sync {
    async fn lookup_isrc(&self, isrc: &str) ->
        Result<Option<RecordingMatch>, ResolverError>;

    async fn search(&self, name: &str, artist: &str) ->
        Result<Option<RecordingMatch>, ResolverError>;
}

/// Shape shared by /isrc and /recording search responses
#[derive(Debug, Deserialize)]
pub struct RecordingList {
    pub recordings: Option<Vec<Recording>>
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Recording {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub artist_credit: Vec<ArtistCredit>,
    pub first_release_date: Option<String>,
    pub length: Option<u64>,
    pub score: Option<u32>
}

#[derive(Debug, Deserialize)]
pub struct ArtistCredit {
    pub name: Option<String>,
    pub artist: Option<Artist>
}

#[derive(Debug, Deserialize)]
pub struct Artist {
    pub name: Option<String>
}

impl ArtistCredit {
    /// Credited name, else the artist's own name
    fn display_name(&self) -> Option<&str> {
        self.name.as_deref()
            .filter(|n| !n.is_empty())
            .or_else(|| self.artist.as_ref()?.name.as_deref())
            .filter(|n| !n.is_empty())
    }
}

impl Recording {
    pub fn into_match(self) -> RecordingMatch {
        let names: Vec<&str> = self.artist_credit.iter()
            .filter_map(ArtistCredit::display_name)
            .collect();
        let artist_credit = if names.is_empty() {
            "Unknown".to_string()
        } else {
            names.join(", ")
        };

        RecordingMatch {
            artist_credit,
            id: self.id,
            title: self.title,
            first_release_date: self.first_release_date,
            duration_ms: self.length
        }
    }
}

/// Backslash-escapes lucene query syntax so user text stays a literal phrase
pub fn escape_lucene(s: &str) -> String {
    const SPECIAL: &[char] = &[
        '+', '-', '&', '|', '!', '(', ')', '{', '}', '[', ']',
        '^', '"', '~', '*', '?', ':', '\\', '/'
    ];
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if SPECIAL.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

pub fn recording_query(name: &str, artist: &str) -> String {
    format!(
        "recording:\"{}\" AND artist:\"{}\"",
        escape_lucene(name), escape_lucene(artist)
    )
}

pub struct MusicBrainzLookup {
    client: MusicBrainzClient,
    gate: Arc<RateGate>,
    search_limit: u32,
    min_score: u32
}

impl MusicBrainzLookup {
    pub fn new(client: MusicBrainzClient, gate: Arc<RateGate>, cfg: &MusicBrainzConfig) -> Self {
        Self {
            client,
            gate,
            search_limit: cfg.search_limit,
            min_score: u32::from(cfg.min_score)
        }
    }

    async fn fetch_list(&self, request: reqwest::RequestBuilder, context: &'static str) ->
        Result<Option<RecordingList>, ResolverError> {
        self.gate.acquire().await;
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(ResolverError::Status { context, status: status.as_u16() });
        }

        let body = response.bytes().await?;
        let list = serde_json::from_slice::<RecordingList>(&body)?;
        Ok(Some(list))
    }
}

#[async_trait]
impl RecordingLookup for MusicBrainzLookup {
    async fn lookup_isrc(&self, isrc: &str) ->
        Result<Option<RecordingMatch>, ResolverError> {
        let request = self.client.lookup_isrc(isrc)?;
        let Some(list) = self.fetch_list(request, "MusicBrainz ISRC lookup").await? else {
            debug!(isrc, "isrc.not_found");
            return Ok(None);
        };

        let first = list.recordings.unwrap_or_default().into_iter().next();
        Ok(first.map(Recording::into_match))
    }

    async fn search(&self, name: &str, artist: &str) ->
        Result<Option<RecordingMatch>, ResolverError> {
        let query = recording_query(name, artist);
        let request = self.client.search_recording(&query, self.search_limit)?;

        // search never legitimately 404s; treat it like any other failure
        let list = self.fetch_list(request, "MusicBrainz search").await?
            .ok_or(ResolverError::Status { context: "MusicBrainz search", status: 404 })?;

        let Some(best) = list.recordings.unwrap_or_default().into_iter().next() else {
            return Ok(None);
        };

        if let Some(score) = best.score {
            if score < self.min_score {
                debug!(%query, score, min = self.min_score, "search.low_score");
                return Ok(None);
            }
        }
        Ok(Some(best.into_match()))
    }
}
