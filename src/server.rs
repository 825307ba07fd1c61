//!
//! src/server.rs  Oct 16th, 2026
//!
//! HTTP surface: json endpoints that accept platform tracks and answer
//! with per-track resolution results.
//!

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::errors::ResolverError;
use crate::platform::{AppleCatalog, SpotifyTrack};
use crate::resolver::Resolver;
use crate::types::TrackInput;

#[derive(Clone)]
pub struct AppContext {
    pub resolver: Resolver,
    pub apple: Arc<AppleCatalog>,
    pub max_tracks: usize
}

/// Request validation failures, rendered as `{ "error": ... }`
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Misconfigured(String)
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Misconfigured(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Unreadable or non-json bodies still answer with the error envelope
fn json_body(body: Result<Json<Value>, JsonRejection>) -> Result<Value, ApiError> {
    body.map(|Json(value)| value)
        .map_err(|e| ApiError::BadRequest(e.body_text()))
}

/// Pulls `key` out of the body as a non-empty array within the per-request
/// cap, then reads each entry as `T`
fn batch_field<T: DeserializeOwned>(body: &Value, key: &str, max: usize) ->
    Result<Vec<T>, ApiError> {
    let items = body.get(key)
        .and_then(Value::as_array)
        .filter(|items| !items.is_empty())
        .ok_or_else(|| ApiError::BadRequest(
            format!("Request body must include a non-empty \"{key}\" array")
        ))?;
    if items.len() > max {
        return Err(ApiError::BadRequest(format!("Maximum {max} tracks per request")));
    }

    items.iter()
        .map(|item| T::deserialize(item))
        .collect::<Result<Vec<T>, _>>()
        .map_err(|e| ApiError::BadRequest(format!("Invalid \"{key}\" entry: {e}")))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// POST /api/musicbrainz/lookup
async fn musicbrainz_lookup(
    State(ctx): State<AppContext>,
    body: Result<Json<Value>, JsonRejection>
) -> Result<Json<Value>, ApiError> {
    let body = json_body(body)?;
    let tracks: Vec<TrackInput> = batch_field(&body, "tracks", ctx.max_tracks)?;
    let results = ctx.resolver.resolve_all(&tracks).await;
    Ok(Json(json!({ "results": results })))
}

/// POST /api/spotify/catalog
async fn spotify_catalog(
    State(ctx): State<AppContext>,
    body: Result<Json<Value>, JsonRejection>
) -> Result<Json<Value>, ApiError> {
    let body = json_body(body)?;
    let items: Vec<SpotifyTrack> = batch_field(&body, "items", ctx.max_tracks)?;
    let tracks: Vec<TrackInput> = items.into_iter().map(TrackInput::from).collect();
    let results = ctx.resolver.resolve_all(&tracks).await;
    Ok(Json(json!({ "results": results })))
}

/// Validates an apple request and returns (ids, developer token, user token)
fn apple_params(ctx: &AppContext, body: &Value, max: usize) ->
    Result<(Vec<String>, String, String), ApiError> {
    let ids: Vec<String> = batch_field(body, "trackIds", max)?;
    let user_token = body.get("userMusicToken")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::BadRequest("userMusicToken is required".to_string()))?
        .to_string();
    let developer_token = ctx.apple.developer_token()
        .ok_or_else(|| ApiError::Misconfigured("Missing Apple Music configuration".to_string()))?
        .to_string();
    Ok((ids, developer_token, user_token))
}

/// POST /api/apple/catalog
async fn apple_catalog(
    State(ctx): State<AppContext>,
    body: Result<Json<Value>, JsonRejection>
) -> Result<Json<Value>, ApiError> {
    let body = json_body(body)?;
    let (ids, developer_token, user_token) = apple_params(&ctx, &body, usize::MAX)?;
    let tracks = ctx.apple.enrich(&ids, &developer_token, &user_token).await;
    Ok(Json(json!({ "tracks": tracks })))
}

/// POST /api/apple/resolve
async fn apple_resolve(
    State(ctx): State<AppContext>,
    body: Result<Json<Value>, JsonRejection>
) -> Result<Json<Value>, ApiError> {
    let body = json_body(body)?;
    let (ids, developer_token, user_token) = apple_params(&ctx, &body, ctx.max_tracks)?;

    let enriched = ctx.apple.enrich(&ids, &developer_token, &user_token).await;
    let tracks: Vec<TrackInput> = enriched.iter().map(|t| t.to_track_input()).collect();
    let results = ctx.resolver.resolve_all(&tracks).await;
    Ok(Json(json!({ "results": results })))
}

pub fn router(ctx: AppContext) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/musicbrainz/lookup", post(musicbrainz_lookup))
        .route("/api/spotify/catalog", post(spotify_catalog))
        .route("/api/apple/catalog", post(apple_catalog))
        .route("/api/apple/resolve", post(apple_resolve))
        .with_state(ctx)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Serves until ctrl-c or until `shutdown` is cancelled elsewhere
pub async fn run(cfg: &ServerConfig, ctx: AppContext, shutdown: CancellationToken) ->
    Result<(), ResolverError> {
    let listener = tokio::net::TcpListener::bind(cfg.bind).await?;
    info!(addr = %cfg.bind, max_tracks = ctx.max_tracks, "server.start");

    let trigger = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!(msg = "shutting resolver down", "server.signal");
            trigger.cancel();
        }
    });

    axum::serve(listener, router(ctx))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    info!("server.exit");
    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;
    use url::Url;

    use super::*;
    use crate::config::{AppleMusicConfig, HttpConfig};
    use crate::fetch::AppleMusicClient;
    use crate::test_utils::{Script, ScriptedLookup, recording};

    fn context(lookup: ScriptedLookup, developer_token: Option<&str>) -> AppContext {
        let cfg = AppleMusicConfig {
            api_base: Url::parse("https://api.music.apple.com/v1/").unwrap(),
            storefront: "us".to_string(),
            developer_token: developer_token.map(str::to_string),
            batch_size: 10,
        };
        let apple = AppleMusicClient::new(&HttpConfig::default(), &cfg).unwrap();
        AppContext {
            resolver: Resolver::new(Arc::new(lookup)),
            apple: Arc::new(AppleCatalog::new(apple)),
            max_tracks: 50,
        }
    }

    async fn post_raw(ctx: AppContext, uri: &str, body: String) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();
        let response = router(ctx).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn post_json(ctx: AppContext, uri: &str, body: Value) -> (StatusCode, Value) {
        post_raw(ctx, uri, body.to_string()).await
    }

    #[tokio::test]
    async fn lookup_returns_results_in_order() {
        let lookup = ScriptedLookup::default()
            .on_isrc("GBAAM8000007", Script::Match(recording("abc-123", "Blue Monday", "New Order")));
        let body = json!({ "tracks": [
            {"sourceId": "t1", "name": "Blue Monday", "artistName": "New Order", "isrc": "GBAAM8000007"},
            {"sourceId": "t2", "name": "zzqx", "artistName": "qqzx"}
        ]});

        let (status, value) = post_json(context(lookup, None), "/api/musicbrainz/lookup", body).await;

        assert_eq!(status, StatusCode::OK);
        let results = value["results"].as_array().unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0], json!({
            "sourceId": "t1",
            "name": "Blue Monday",
            "artistName": "New Order",
            "matchedId": "abc-123",
            "matchedTitle": "Blue Monday",
            "matchedArtist": "New Order",
            "status": "matched"
        }));
        assert_eq!(results[1]["status"], "not_found");
        assert!(results[1]["matchedId"].is_null());
    }

    #[tokio::test]
    async fn lookup_rejects_empty_batch() {
        let (status, value) = post_json(
            context(ScriptedLookup::default(), None),
            "/api/musicbrainz/lookup",
            json!({ "tracks": [] })
        ).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(value["error"], "Request body must include a non-empty \"tracks\" array");
    }

    #[tokio::test]
    async fn lookup_rejects_oversized_batch() {
        let tracks: Vec<Value> = (0..51)
            .map(|i| json!({"sourceId": format!("t{i}"), "name": "a", "artistName": "b"}))
            .collect();
        let lookup = ScriptedLookup::default();
        let ctx = context(lookup, None);

        let (status, value) = post_json(ctx, "/api/musicbrainz/lookup", json!({ "tracks": tracks })).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(value["error"], "Maximum 50 tracks per request");
    }

    #[tokio::test]
    async fn spotify_catalog_maps_then_resolves() {
        let lookup = ScriptedLookup::default()
            .on_isrc("AUUM71900929", Script::Match(recording("mb-1", "Breathe Deeper", "Tame Impala")));
        let body = json!({ "items": [{
            "id": "6GtOsEzNUhJghrIf6UTbRV",
            "name": "Breathe Deeper",
            "artists": [{"name": "Tame Impala"}],
            "external_ids": {"isrc": "AUUM71900929"}
        }]});

        let (status, value) = post_json(context(lookup, None), "/api/spotify/catalog", body).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(value["results"][0]["sourceId"], "6GtOsEzNUhJghrIf6UTbRV");
        assert_eq!(value["results"][0]["matchedId"], "mb-1");
    }

    #[tokio::test]
    async fn spotify_catalog_requires_items() {
        let (status, value) = post_json(
            context(ScriptedLookup::default(), None),
            "/api/spotify/catalog",
            json!({})
        ).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(value["error"], "Request body must include a non-empty \"items\" array");
    }

    #[tokio::test]
    async fn apple_catalog_requires_user_token() {
        let (status, value) = post_json(
            context(ScriptedLookup::default(), Some("dev")),
            "/api/apple/catalog",
            json!({ "trackIds": ["i.abc"] })
        ).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(value["error"], "userMusicToken is required");
    }

    #[tokio::test]
    async fn apple_catalog_without_developer_token_is_misconfigured() {
        let (status, value) = post_json(
            context(ScriptedLookup::default(), None),
            "/api/apple/catalog",
            json!({ "trackIds": ["i.abc"], "userMusicToken": "user" })
        ).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(value["error"], "Missing Apple Music configuration");
    }

    #[tokio::test]
    async fn health_is_ok() {
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = router(context(ScriptedLookup::default(), None))
            .oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn lookup_rejects_non_array_tracks() {
        let (status, value) = post_json(
            context(ScriptedLookup::default(), None),
            "/api/musicbrainz/lookup",
            json!({ "tracks": "x" })
        ).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(value["error"], "Request body must include a non-empty \"tracks\" array");
    }

    #[tokio::test]
    async fn unparseable_body_gets_error_envelope() {
        let (status, value) = post_raw(
            context(ScriptedLookup::default(), None),
            "/api/musicbrainz/lookup",
            "not json".to_string()
        ).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(value["error"].is_string());
    }

    #[tokio::test]
    async fn track_without_source_id_still_resolves() {
        let lookup = ScriptedLookup::default()
            .on_search("a", Script::Match(recording("m-a", "a", "b")));
        let body = json!({ "tracks": [
            {"name": "a", "artistName": "b"},
            {"sourceId": "t2", "name": "zzqx", "artistName": "qqzx"}
        ]});

        let (status, value) = post_json(context(lookup, None), "/api/musicbrainz/lookup", body).await;

        assert_eq!(status, StatusCode::OK);
        let results = value["results"].as_array().unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0]["sourceId"], "");
        assert_eq!(results[0]["matchedId"], "m-a");
        assert_eq!(results[1]["sourceId"], "t2");
    }

    #[tokio::test]
    async fn malformed_track_entry_gets_error_envelope() {
        let (status, value) = post_json(
            context(ScriptedLookup::default(), None),
            "/api/musicbrainz/lookup",
            json!({ "tracks": [{"sourceId": 7}] })
        ).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(value["error"].as_str().unwrap().starts_with("Invalid \"tracks\" entry"));
    }
}
