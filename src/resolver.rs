//!
//! src/resolver.rs  Oct 16th, 2026
//!
//! Maps a platform track onto a musicbrainz recording. ISRC lookup is
//! tried first and short-circuits; text search is the fallback. Every
//! outcome, failures included, ends up as a TrackResult.
//!

use std::sync::Arc;

use tracing::{Instrument, debug, info, info_span, warn};

use crate::errors::ResolverError;
use crate::lookup::RecordingLookup;
use crate::types::{ResolveStatus, TrackInput, TrackResult};

#[derive(Clone)]
pub struct Resolver {
    lookup: Arc<dyn RecordingLookup>
}

impl Resolver {
    pub fn new(lookup: Arc<dyn RecordingLookup>) -> Self {
        Self { lookup }
    }

    pub async fn resolve(&self, track: &TrackInput) -> TrackResult {
        // first failure seen; reported only if nothing matches afterwards
        let mut failure: Option<ResolverError> = None;

        if let Some(isrc) = track.isrc() {
            match self.lookup.lookup_isrc(isrc).await {
                Ok(Some(recording)) => {
                    debug!(
                        mbid = %recording.id, isrc,
                        released = ?recording.first_release_date,
                        "resolve.matched.isrc"
                    );
                    return TrackResult::matched(track, recording);
                }
                Ok(None) => debug!(isrc, "resolve.isrc.miss"),
                Err(e) => {
                    warn!(isrc, error = %e, "resolve.isrc.error");
                    failure = Some(e);
                }
            }
        }

        if track.searchable() {
            match self.lookup.search(&track.name, &track.artist_name).await {
                Ok(Some(recording)) => {
                    debug!(
                        mbid = %recording.id,
                        length_ms = ?recording.duration_ms,
                        "resolve.matched.search"
                    );
                    return TrackResult::matched(track, recording);
                }
                Ok(None) => debug!("resolve.search.miss"),
                Err(e) => {
                    warn!(error = %e, "resolve.search.error");
                    failure.get_or_insert(e);
                }
            }
        } else {
            debug!("resolve.search.skipped");
        }

        match failure {
            Some(e) => TrackResult::failed(track, e.to_string()),
            None => TrackResult::not_found(track)
        }
    }

    /// Resolves tracks one after another in input order. A failed track
    /// never stops the ones after it.
    pub async fn resolve_all(&self, tracks: &[TrackInput]) -> Vec<TrackResult> {
        let mut results = Vec::with_capacity(tracks.len());
        for (index, track) in tracks.iter().enumerate() {
            let span = info_span!("resolve", index, source_id = %track.source_id);
            results.push(self.resolve(track).instrument(span).await);
        }

        let matched = count(&results, ResolveStatus::Matched);
        let errors = count(&results, ResolveStatus::Error);
        info!(
            total = results.len(), matched, errors,
            not_found = results.len() - matched - errors,
            "batch.done"
        );
        results
    }
}

fn count(results: &[TrackResult], status: ResolveStatus) -> usize {
    results.iter().filter(|r| r.status == status).count()
}
