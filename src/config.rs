//!
//! src/config.rs  Oct 16th, 2026
//!
//! Builds the service configuration from the environment (and .env).
//! Builders read through an env accessor so they can be exercised
//! without touching the process environment.
//!

use std::{net::SocketAddr, time};

use url::Url;

use crate::errors::ResolverError;

/// Constants for HTTP Config
pub const HTTP_TIMEOUT: u64 = 8000;
pub const HTTP_CONNECT_TIMEOUT: u64 = 2000;
pub const HTTP_POOL_MAX_IDLE: usize = 16;
pub const HTTP_POOL_IDLE_TIMEOUT: u64 = 90000;
pub const HTTP_MAX_REDIRECTS: u8 = 4;

/// MusicBrainz policy values
pub const MB_MIN_INTERVAL_MS: u64 = 1100;
pub const MB_MIN_INTERVAL_FLOOR_MS: u64 = 1000;
pub const MB_SEARCH_LIMIT: u32 = 1;
pub const MB_MIN_SCORE: u8 = 80;

pub const APPLE_BATCH_SIZE: usize = 10;
pub const MAX_TRACKS_PER_REQUEST: usize = 50;

/// Lookup of a single environment variable
pub type Env<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Wrapper over the env accessor to return a missing variable error
fn env_check(env: Env, s: &str) -> Result<String, ResolverError> {
    match env(s) {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ResolverError::Config(format!("{s} was not set"))),
    }
}

fn env_or(env: Env, s: &str, default: &str) -> String {
    env(s)
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Parses a numeric variable, falling back to default when absent or invalid
fn env_parse<T: std::str::FromStr>(env: Env, s: &str, default: T) -> T {
    env(s)
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

/// Ensures that url is https
fn ensure_https(url: &Url) -> Result<(), String> {
    if url.scheme() == "https" {
        Ok(())
    } else {
        Err(format!("URL must be https: {url}"))
    }
}

fn ensure_host(url: &Url, expected_host: &str) -> Result<(), String> {
    match url.host_str() {
        Some(h) if h.eq_ignore_ascii_case(expected_host) => Ok(()),
        Some(h) => Err(
            format!("Unexpected host for {url} (got {h}, expected {expected_host})")
        ),
        None => Err(format!("URL missing host: {url}"))
    }
}

/// Parses a base url, checks scheme and host, and ensures a trailing slash
/// so that relative joins append rather than replace the last segment
fn base_url(raw: &str, var: &str, host: &str) -> Result<Url, ResolverError> {
    let mut url = Url::parse(raw)
        .map_err(|e| ResolverError::Config(format!("{var} invalid {e}")))?;

    ensure_https(&url).map_err(ResolverError::Config)?;
    ensure_host(&url, host).map_err(ResolverError::Config)?;

    if !url.path().ends_with('/') {
        let mut path = url.path().to_string();
        path.push('/');
        url.set_path(&path);
    }
    Ok(url)
}

/// Identity expected by musicbrainz on every request
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    pub mb_user_agent: String,
}

fn build_identity(env: Env) -> Result<IdentityConfig, ResolverError> {
    let application   = env_check(env, "APPLICATION")?;
    let header        = env_check(env, "MUSIC_BRAINZ_HEADER")?;
    let mb_user_agent = format!("{application} {header}");

    Ok( IdentityConfig { mb_user_agent } )
}

///
/// Configuration for musicbrainz api
///
#[derive(Debug, Clone)]
pub struct MusicBrainzConfig {
    pub base_url: Url,                  // https://musicbrainz.org/ws/2/
    pub user_agent: String,             // app/version (ex@mail.com)
    pub min_interval: time::Duration,   // default 1100ms
    pub search_limit: u32,              // default 1
    pub min_score: u8                   // default 80
}

fn build_musicbrainz(env: Env, identity: &IdentityConfig) ->
    Result<MusicBrainzConfig, ResolverError> {

    let raw = env_or(env, "MB_BASE_URL", "https://musicbrainz.org/ws/2/");
    let base_url = base_url(&raw, "MB_BASE_URL", "musicbrainz.org")?;

    // musicbrainz allows one request per second; never go below it
    let min_interval = time::Duration::from_millis(
        env_parse(env, "MB_MIN_INTERVAL_MS", MB_MIN_INTERVAL_MS)
            .max(MB_MIN_INTERVAL_FLOOR_MS)
    );
    let search_limit = env_parse(env, "MB_SEARCH_LIMIT", MB_SEARCH_LIMIT).max(1);
    let min_score    = env_parse(env, "MB_MIN_SCORE", MB_MIN_SCORE).min(100);

    Ok( MusicBrainzConfig {
        base_url,
        user_agent: identity.mb_user_agent.clone(),
        min_interval,
        search_limit,
        min_score,
    })
}

///
/// Configuration for the Apple Music catalog api. The developer token is
/// issued elsewhere and handed to us as-is.
///
#[derive(Debug, Clone)]
pub struct AppleMusicConfig {
    pub api_base: Url,
    pub storefront: String,
    pub developer_token: Option<String>,
    pub batch_size: usize
}

fn build_apple(env: Env) -> Result<AppleMusicConfig, ResolverError> {
    let raw = env_or(env, "APPLE_API_BASE", "https://api.music.apple.com/v1/");
    let api_base = base_url(&raw, "APPLE_API_BASE", "api.music.apple.com")?;

    let storefront = env_or(env, "APPLE_STOREFRONT", "us");
    let developer_token = env("APPLE_DEVELOPER_TOKEN")
        .filter(|t| !t.trim().is_empty());
    let batch_size = env_parse(env, "APPLE_BATCH_SIZE", APPLE_BATCH_SIZE).max(1);

    Ok( AppleMusicConfig { api_base, storefront, developer_token, batch_size } )
}

///
/// Configuration for Http timeouts, pooling etc.
///
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub timeout: time::Duration,
    pub connect_timeout: time::Duration,
    pub pool_max_idle_per_host: usize,
    pub pool_idle_timeout: time::Duration,
    pub max_redirects: u8,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: time::Duration::from_millis(HTTP_TIMEOUT),
            connect_timeout: time::Duration::from_millis(HTTP_CONNECT_TIMEOUT),
            pool_max_idle_per_host: HTTP_POOL_MAX_IDLE,
            pool_idle_timeout: time::Duration::from_millis(HTTP_POOL_IDLE_TIMEOUT),
            max_redirects: HTTP_MAX_REDIRECTS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub max_tracks: usize
}

fn build_server(env: Env) -> Result<ServerConfig, ResolverError> {
    let raw = env_or(env, "BIND_ADDR", "0.0.0.0:3001");
    let bind = raw.parse::<SocketAddr>()
        .map_err(|e| ResolverError::Config(format!("BIND_ADDR invalid {e}")))?;
    let max_tracks = env_parse(env, "MAX_TRACKS_PER_REQUEST", MAX_TRACKS_PER_REQUEST);

    Ok( ServerConfig { bind, max_tracks } )
}

///
/// Configuration for Logger
///

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json
}

impl LogFormat {
    pub fn parse(s: &str) -> Option<LogFormat> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Some(LogFormat::Pretty),
            "json"   => Some(LogFormat::Json),
            _ => None
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub filter_directives: String,
    pub format: LogFormat,
    pub with_ansi: bool,
    pub include_file_line: bool,
    pub include_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter_directives: "info,rs_id_resolver=debug,reqwest=warn".to_string(),
            format: LogFormat::Json,
            with_ansi: true,
            include_file_line: true,
            include_target: true,
        }
    }
}

fn build_logging(env: Env) -> LoggingConfig {
    let mut logging = LoggingConfig::default();
    if let Some(format) = env("LOG_FORMAT").as_deref().and_then(LogFormat::parse) {
        logging.format = format;
    }
    logging
}

///
/// AppConfig which holds everything the service needs at startup
///
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub musicbrainz: MusicBrainzConfig,
    pub apple: AppleMusicConfig,
    pub http: HttpConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig
}

pub fn load_config_from(env: Env) -> Result<AppConfig, ResolverError> {
    let identity    = build_identity(env)?;
    let musicbrainz = build_musicbrainz(env, &identity)?;
    let apple       = build_apple(env)?;
    let http        = HttpConfig::default();
    let server      = build_server(env)?;
    let logging     = build_logging(env);

    Ok( AppConfig { musicbrainz, apple, http, server, logging } )
}

///
/// Return all environment variables to caller at program start.
///
pub fn load_config() -> Result<AppConfig, ResolverError> {
    dotenvy::dotenv().ok();
    load_config_from(&|k| std::env::var(k).ok())
}
