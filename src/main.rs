//!
//! src/main.rs  Oct 16th, 2026
//!
//! Wires configuration, logging, the shared musicbrainz rate gate and
//! the resolver together, then serves the http api
//!
//!

mod config;
mod errors;
mod logging;

mod fetch;
mod lookup;
mod platform;
mod rate;
mod resolver;
mod server;
mod types;

#[cfg(test)]
mod test_utils;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::errors::ResolverError;

#[tokio::main]
async fn main() -> Result<(), ResolverError> {
    let cfgs = config::load_config()?;
    let _logger = logging::init_logging(&cfgs.logging)?;

    tracing::info!(
        service="rs-id-resolver",
        version=%env!("CARGO_PKG_VERSION"),
        "starting"
    );

    let gate = Arc::new(rate::RateGate::new(cfgs.musicbrainz.min_interval));
    tracing::debug!(
        min_interval_ms = gate.min_interval().as_millis() as u64,
        min_score = cfgs.musicbrainz.min_score,
        "musicbrainz.gate"
    );

    let musicbrainz = fetch::MusicBrainzClient::new(&cfgs.http, &cfgs.musicbrainz)?;
    let lookup = lookup::MusicBrainzLookup::new(musicbrainz, gate, &cfgs.musicbrainz);
    let resolver = resolver::Resolver::new(Arc::new(lookup));

    let apple = fetch::AppleMusicClient::new(&cfgs.http, &cfgs.apple)?;
    if cfgs.apple.developer_token.is_none() {
        tracing::warn!("APPLE_DEVELOPER_TOKEN not set; apple endpoints will refuse requests");
    }

    let ctx = server::AppContext {
        resolver,
        apple: Arc::new(platform::AppleCatalog::new(apple)),
        max_tracks: cfgs.server.max_tracks,
    };

    server::run(&cfgs.server, ctx, CancellationToken::new()).await
}
