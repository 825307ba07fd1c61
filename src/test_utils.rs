//!
//! src/test_utils.rs  Oct 16th, 2026
//!
//! Shared helpers for unit tests: config builders, an in-process stub
//! http server, and a scripted lookup double.
//!

use std::net::SocketAddr;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::config::MusicBrainzConfig;
use crate::errors::ResolverError;
use crate::lookup::RecordingLookup;
use crate::types::{RecordingMatch, TrackInput};

pub fn mb_config(base: &str, min_interval: Duration) -> MusicBrainzConfig {
    MusicBrainzConfig {
        base_url: Url::parse(base).unwrap(),
        user_agent: "rs-id-resolver-test/0.1 ( test@example.com )".to_string(),
        min_interval,
        search_limit: 1,
        min_score: 80,
    }
}

/// Serves `router` on an ephemeral local port for the rest of the test
pub async fn spawn_stub(router: axum::Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

pub fn track(source_id: &str, name: &str, artist: &str, isrc: Option<&str>) -> TrackInput {
    TrackInput {
        source_id: source_id.to_string(),
        name: name.to_string(),
        artist_name: artist.to_string(),
        isrc: isrc.map(str::to_string),
        ..Default::default()
    }
}

pub fn recording(id: &str, title: &str, artist: &str) -> RecordingMatch {
    RecordingMatch {
        id: id.to_string(),
        title: title.to_string(),
        artist_credit: artist.to_string(),
        first_release_date: None,
        duration_ms: None,
    }
}

/// Canned outcome for one strategy call
#[derive(Debug, Clone)]
pub enum Script {
    Match(RecordingMatch),
    NoMatch,
    Fail(String)
}

impl Script {
    fn play(&self) -> Result<Option<RecordingMatch>, ResolverError> {
        match self {
            Script::Match(m) => Ok(Some(m.clone())),
            Script::NoMatch => Ok(None),
            Script::Fail(msg) => Err(ResolverError::Http(msg.clone())),
        }
    }
}

/// Lookup double keyed by ISRC / track name, recording every call made.
/// Keys without a script answer `NoMatch`.
#[derive(Default)]
pub struct ScriptedLookup {
    pub isrc: Vec<(String, Script)>,
    pub search: Vec<(String, Script)>,
    pub calls: Mutex<Vec<String>>
}

impl ScriptedLookup {
    pub fn on_isrc(mut self, isrc: &str, script: Script) -> Self {
        self.isrc.push((isrc.to_string(), script));
        self
    }

    pub fn on_search(mut self, name: &str, script: Script) -> Self {
        self.search.push((name.to_string(), script));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn find(scripts: &[(String, Script)], key: &str) -> Script {
        scripts.iter()
            .find(|(k, _)| k == key)
            .map(|(_, s)| s.clone())
            .unwrap_or(Script::NoMatch)
    }
}

#[async_trait]
impl RecordingLookup for ScriptedLookup {
    async fn lookup_isrc(&self, isrc: &str) ->
        Result<Option<RecordingMatch>, ResolverError> {
        self.calls.lock().unwrap().push(format!("isrc:{isrc}"));
        Self::find(&self.isrc, isrc).play()
    }

    async fn search(&self, name: &str, artist: &str) ->
        Result<Option<RecordingMatch>, ResolverError> {
        self.calls.lock().unwrap().push(format!("search:{name}|{artist}"));
        Self::find(&self.search, name).play()
    }
}
