//!
//! src/fetch.rs  Oct 16th, 2026
//!
//! Defines methods for hitting specified endpoints and
//! returning unsent requests. Callers decide how to read the response.
//!

use url::Url;
use reqwest::{Client, header, redirect, RequestBuilder};

use crate::config::{AppleMusicConfig, HttpConfig, MusicBrainzConfig};
use crate::errors::ResolverError;

/// Client building functionality
fn client_helper(http: &HttpConfig) -> reqwest::ClientBuilder  {
    Client::builder()
        .timeout(http.timeout)
        .connect_timeout(http.connect_timeout)
        .pool_max_idle_per_host(http.pool_max_idle_per_host)
        .pool_idle_timeout(Some(http.pool_idle_timeout))
        .redirect(redirect::Policy::limited(http.max_redirects as usize))
}

fn client_with_headers(http: &HttpConfig, headers: header::HeaderMap) ->
    Result<Client, ResolverError> {
    client_helper(http)
        .default_headers(headers)
        .build()
        .map_err(|e| ResolverError::Http(format!("build client: {e}")))
}

fn json_headers() -> header::HeaderMap {
    let mut h = header::HeaderMap::new();
    h.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));
    h
}

pub fn musicbrainz_client(http: &HttpConfig, user_agent: &str) ->
    Result<Client, ResolverError> {

    let mut h = json_headers();
    h.insert(
        header::USER_AGENT,
        header::HeaderValue::from_str(user_agent)
            .map_err(|e| ResolverError::Config(
                format!("invalid mb user-agent {e}")
            ))?
    );
    client_with_headers(http, h)
}

/// Appends path segments to a base url, percent-encoding each one
fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, ResolverError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| ResolverError::Config(format!("cannot-be-a-base url: {base}")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

#[derive(Debug, Clone)]
pub struct MusicBrainzClient {
    pub http: Client,
    pub base: Url,
}

impl MusicBrainzClient {
    pub fn new(http_config: &HttpConfig, cfg: &MusicBrainzConfig) ->
        Result<Self, ResolverError> {
        let http = musicbrainz_client(http_config, &cfg.user_agent)?;
        Ok( Self { http, base: cfg.base_url.clone() })
    }

    /// GET /ws/2/isrc/{ISRC}?inc=artist-credits&fmt=json
    pub fn lookup_isrc(&self, isrc: &str) -> Result<RequestBuilder, ResolverError> {
        let url = endpoint(&self.base, &["isrc", isrc])?;
        Ok(self.http.get(url).query(&[("inc", "artist-credits"), ("fmt", "json")]))
    }

    /// GET /ws/2/recording?query=...&fmt=json&limit=
    pub fn search_recording(&self, lucene: &str, limit: u32) ->
        Result<RequestBuilder, ResolverError> {
        let url = endpoint(&self.base, &["recording"])?;
        let limit = limit.to_string();
        Ok(self.http.get(url).query(&[
            ("query", lucene),
            ("fmt", "json"),
            ("limit", limit.as_str()),
        ]))
    }
}

#[derive(Clone, Debug)]
pub struct AppleMusicClient {
    pub http: Client,
    pub cfg: AppleMusicConfig
}

impl AppleMusicClient {
    pub fn new(http_cfg: &HttpConfig, cfg: &AppleMusicConfig) ->
        Result<Self, ResolverError> {
        let http = client_with_headers(http_cfg, json_headers())?;
        Ok( Self { http, cfg: cfg.clone() })
    }

    fn authorized(&self, rb: RequestBuilder, developer_token: &str, user_token: &str) ->
        RequestBuilder {
        rb.bearer_auth(developer_token).header("Music-User-Token", user_token)
    }

    /// GET /v1/me/library/songs/{id}?include=catalog
    pub fn library_song(&self, id: &str, developer_token: &str, user_token: &str) ->
        Result<RequestBuilder, ResolverError> {
        let url = endpoint(&self.cfg.api_base, &["me", "library", "songs", id])?;
        let rb = self.http.get(url).query(&[("include", "catalog")]);
        Ok(self.authorized(rb, developer_token, user_token))
    }

    /// GET /v1/catalog/{storefront}/songs/{id}
    pub fn catalog_song(&self, id: &str, developer_token: &str, user_token: &str) ->
        Result<RequestBuilder, ResolverError> {
        let url = endpoint(
            &self.cfg.api_base, &["catalog", &self.cfg.storefront, "songs", id]
        )?;
        Ok(self.authorized(self.http.get(url), developer_token, user_token))
    }
}
