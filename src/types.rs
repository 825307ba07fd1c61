//!
//! src/types.rs  Oct 16th, 2026
//!
//! Track inputs and per-track results shared by the resolver and the api
//!

use serde::{Deserialize, Serialize};

/// A track as handed to us by a platform adapter or api caller
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackInput {
    #[serde(default, alias = "appleMusicId")]
    pub source_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub artist_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isrc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_in_millis: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artwork_url: Option<String>,
}

impl TrackInput {
    /// ISRC if one was supplied; blank strings count as absent
    pub fn isrc(&self) -> Option<&str> {
        self.isrc.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// Text search needs both a title and an artist to build its query
    pub fn searchable(&self) -> bool {
        !self.name.trim().is_empty() && !self.artist_name.trim().is_empty()
    }
}

/// Normalized recording returned by either lookup strategy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingMatch {
    pub id: String,
    pub title: String,
    pub artist_credit: String,
    pub first_release_date: Option<String>,
    pub duration_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolveStatus {
    Matched,
    NotFound,
    Error
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackResult {
    pub source_id: String,
    pub name: String,
    pub artist_name: String,
    pub matched_id: Option<String>,
    pub matched_title: Option<String>,
    pub matched_artist: Option<String>,
    pub status: ResolveStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TrackResult {
    fn unmatched(track: &TrackInput, status: ResolveStatus, error: Option<String>) -> Self {
        Self {
            source_id: track.source_id.clone(),
            name: track.name.clone(),
            artist_name: track.artist_name.clone(),
            matched_id: None,
            matched_title: None,
            matched_artist: None,
            status,
            error
        }
    }

    pub fn matched(track: &TrackInput, recording: RecordingMatch) -> Self {
        Self {
            source_id: track.source_id.clone(),
            name: track.name.clone(),
            artist_name: track.artist_name.clone(),
            matched_id: Some(recording.id),
            matched_title: Some(recording.title),
            matched_artist: Some(recording.artist_credit),
            status: ResolveStatus::Matched,
            error: None
        }
    }

    pub fn not_found(track: &TrackInput) -> Self {
        Self::unmatched(track, ResolveStatus::NotFound, None)
    }

    pub fn failed(track: &TrackInput, message: String) -> Self {
        Self::unmatched(track, ResolveStatus::Error, Some(message))
    }
}
