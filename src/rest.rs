//! The rest module wires the [Service] onto HTTP (`spec.md` §4.4, §6): axum handlers for every
//! endpoint in the endpoint table, validation at the boundary, one info line per request, and the
//! `Cache-Control` header on every successful lookup.

use crate::config::Config;
use crate::error::EdgeError;
use crate::metrics::encode_metrics;
use crate::mojang::ProfileResponse;
use crate::service::Service;
use crate::validate::{parse_uuid, validate_texture_id};
use axum::extract::{ConnectInfo, Path, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

const SIGN_IN_HEADER: &str = "x-bedgg-api-key";

/// Shared axum application state: the orchestration [Service] plus the bits of [Config] the
/// handlers need directly (the sign-in api key, the cache TTL for the `Cache-Control` header).
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<Service>,
    pub sign_in_api_key: String,
    pub cache_control: HeaderValue,
    pub metrics_enabled: bool,
}

impl AppState {
    pub fn new(service: Arc<Service>, config: &Config) -> Self {
        let cache_control = HeaderValue::from_str(&format!(
            "private, max-age={}",
            config.cache.client_ttl_secs
        ))
        .expect("cache-control value is a valid header value");
        Self {
            service,
            sign_in_api_key: config.sign_in.api_key.clone(),
            cache_control,
            metrics_enabled: config.metrics.enabled,
        }
    }
}

/// Builds the full router (`spec.md` §6 endpoint table). CORS is expected to be layered on by the
/// deployment, not this crate (`spec.md` §6: "CORS allow-list is configured at the boundary").
pub fn router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/profile/{uuid}", get(get_profile))
        .route("/profiles", get(get_profiles))
        .route("/texture/{texture_id}", get(get_texture))
        .route("/textures", get(get_textures))
        .route("/searchKey", get(get_search_key))
        .route("/signIn/{uuid}", post(sign_in))
        .route("/signUp/{uuid}", post(sign_up));

    if state.metrics_enabled {
        router = router.route("/metrics", get(metrics));
    }

    router.with_state(state)
}

#[derive(Debug, Deserialize)]
struct ProfilesRequest {
    uuids: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct TexturesRequest {
    textures: Vec<String>,
}

fn log_request(handler: &'static str, remote: SocketAddr, outcome: Result<(), &EdgeError>) {
    match outcome {
        Ok(()) => info!(handler, remote = %remote, "request handled"),
        Err(err) => info!(handler, remote = %remote, error = %err, "request failed"),
    }
}

async fn get_profile(
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
    Path(raw_uuid): Path<String>,
) -> Result<Response, EdgeError> {
    let uuid = parse_uuid(&raw_uuid)?;
    let result = state.service.get_profile(uuid).await;
    log_request("profile", remote, result.as_ref().map(|_| ()));
    let (body, outcome) = result?;
    crate::metrics::observe_request("profile", outcome.metric_label());
    Ok(json_body(body, &state))
}

async fn get_profiles(
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
    Json(payload): Json<ProfilesRequest>,
) -> Result<Response, EdgeError> {
    let uuids = payload
        .uuids
        .iter()
        .map(|raw| parse_uuid(raw))
        .collect::<Result<Vec<_>, _>>()?;
    let result = state.service.get_profiles(&uuids).await;
    log_request("profiles", remote, result.as_ref().map(|_| ()));
    let profiles: Vec<ProfileResponse> = result?;
    Ok(json_array(&profiles, &state)?)
}

async fn get_texture(
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
    Path(texture_id): Path<String>,
) -> Result<Response, EdgeError> {
    validate_texture_id(&texture_id)?;
    let result = state.service.get_texture(&texture_id).await;
    log_request("texture", remote, result.as_ref().map(|_| ()));
    let (encoded, outcome) = result?;
    crate::metrics::observe_request("texture", outcome.metric_label());
    Ok(text_body(encoded, &state))
}

async fn get_textures(
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
    Json(payload): Json<TexturesRequest>,
) -> Result<Response, EdgeError> {
    for id in &payload.textures {
        validate_texture_id(id)?;
    }
    let result = state.service.get_textures(&payload.textures).await;
    log_request("textures", remote, result.as_ref().map(|_| ()));
    let textures = result?;
    Ok(json_array(&textures, &state)?)
}

async fn get_search_key(
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> Result<Response, EdgeError> {
    let result = state.service.search_key().await;
    log_request("searchKey", remote, result.as_ref().map(|_| ()));
    Ok(text_body(result?, &state))
}

async fn sign_in(
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
    Path(raw_uuid): Path<String>,
) -> Result<Response, EdgeError> {
    let provided = headers
        .get(SIGN_IN_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    if provided != state.sign_in_api_key {
        info!(handler = "signIn", remote = %remote, "rejected: bad api key");
        return Ok(StatusCode::UNAUTHORIZED.into_response());
    }

    let uuid = parse_uuid(&raw_uuid)?;
    let result = state.service.sign_in(uuid).await;
    log_request("signIn", remote, result.as_ref().map(|_| ()));
    result?;
    Ok(StatusCode::OK.into_response())
}

async fn sign_up(
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
    Path(raw_uuid): Path<String>,
) -> Result<Response, EdgeError> {
    let uuid = parse_uuid(&raw_uuid)?;
    let result = state.service.sign_up(uuid).await;
    log_request("signUp", remote, result.as_ref().map(|_| ()));
    result?;
    Ok(StatusCode::OK.into_response())
}

async fn metrics() -> Result<Response, EdgeError> {
    let body = encode_metrics().map_err(|err| EdgeError::SearchIndex(err.to_string()))?;
    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(
            header::CONTENT_TYPE,
            "application/openmetrics-text; version=1.0.0; charset=utf-8",
        )
        .body(body.into())
        .expect("response with known-valid headers always builds"))
}

fn json_body(body: String, state: &AppState) -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::CACHE_CONTROL, state.cache_control.clone())
        .body(body.into())
        .expect("response with known-valid headers always builds")
}

fn text_body(body: String, state: &AppState) -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .header(header::CACHE_CONTROL, state.cache_control.clone())
        .body(body.into())
        .expect("response with known-valid headers always builds")
}

fn json_array<T: serde::Serialize>(value: &T, state: &AppState) -> Result<Response, EdgeError> {
    let body = serde_json::to_string(value)?;
    Ok(json_body(body, state))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::kv::testing::MemoryKvStore;
    use crate::mojang::testing::MojangTestingApi;
    use crate::pubsub::testing::FakePubSub;
    use crate::search::testing::FakeSearchIndex;
    use std::time::Duration;

    fn test_state() -> AppState {
        let service = Arc::new(Service::new(
            Arc::new(MojangTestingApi::with_profiles()),
            Arc::new(MemoryKvStore::new()),
            Arc::new(FakeSearchIndex::new()),
            Arc::new(FakePubSub::new()),
            Duration::from_secs(900),
            "signIn".to_string(),
        ));
        AppState {
            service,
            sign_in_api_key: "secret".to_string(),
            cache_control: HeaderValue::from_static("private, max-age=900"),
            metrics_enabled: true,
        }
    }

    #[test]
    fn router_builds_without_panicking() {
        let _ = router(test_state());
    }
}
