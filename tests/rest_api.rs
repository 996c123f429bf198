//! End-to-end exercises of the HTTP surface against fully in-memory dependencies: the in-process
//! router, a [MemoryKvStore], a canned [MojangTestingApi] and the [FakeSearchIndex]/[FakePubSub].
//! No network, no Redis, no search instance.

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use profile_edge::kv::testing::MemoryKvStore;
use profile_edge::mojang::testing::{HYDROFIN, MojangTestingApi, SCRAYOS};
use profile_edge::pubsub::testing::FakePubSub;
use profile_edge::rest::AppState;
use profile_edge::search::testing::FakeSearchIndex;
use profile_edge::service::Service;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

const SIGN_IN_KEY: &str = "test-sign-in-key";

fn build_router() -> Router {
    let service = Arc::new(Service::new(
        Arc::new(MojangTestingApi::with_profiles()),
        Arc::new(MemoryKvStore::new()),
        Arc::new(FakeSearchIndex::new()),
        Arc::new(FakePubSub::new()),
        Duration::from_secs(900),
        "signIn".to_string(),
    ));
    let state = AppState {
        service,
        sign_in_api_key: SIGN_IN_KEY.to_string(),
        cache_control: axum::http::HeaderValue::from_static("private, max-age=900"),
        metrics_enabled: true,
    };
    profile_edge::rest::router(state)
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn known_profile_is_served_and_carries_cache_control() {
    let router = build_router();

    let response = router
        .oneshot(
            Request::builder()
                .uri(format!("/profile/{}", HYDROFIN.profile.id.simple()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(StatusCode::OK, response.status());
    assert!(response.headers().get("cache-control").is_some());
    let body = body_string(response).await;
    assert!(body.contains("Hydrofin"));
}

#[tokio::test]
async fn malformed_uuid_is_rejected_with_bad_request() {
    let router = build_router();

    let response = router
        .oneshot(
            Request::builder()
                .uri("/profile/not-a-uuid")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(StatusCode::BAD_REQUEST, response.status());
}

#[tokio::test]
async fn unknown_profile_is_not_found() {
    let router = build_router();

    let response = router
        .oneshot(
            Request::builder()
                .uri(format!("/profile/{}", uuid::Uuid::new_v4().simple()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(StatusCode::NOT_FOUND, response.status());
}

#[tokio::test]
async fn batched_profiles_returns_both_known_entries() {
    let router = build_router();
    let payload = format!(
        r#"{{"uuids":["{}","{}"]}}"#,
        HYDROFIN.profile.id, SCRAYOS.profile.id
    );

    let response = router
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/profiles")
                .header("content-type", "application/json")
                .body(Body::from(payload))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(StatusCode::OK, response.status());
    let body = body_string(response).await;
    assert!(body.contains("Hydrofin"));
    assert!(body.contains("Scrayos"));
}

#[tokio::test]
async fn sign_in_rejects_missing_api_key() {
    let router = build_router();

    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/signIn/{}", HYDROFIN.profile.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(StatusCode::UNAUTHORIZED, response.status());
}

#[tokio::test]
async fn sign_in_accepts_correct_api_key() {
    let router = build_router();

    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/signIn/{}", HYDROFIN.profile.id))
                .header("x-bedgg-api-key", SIGN_IN_KEY)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(StatusCode::OK, response.status());
}

#[tokio::test]
async fn sign_up_accepts_any_uuid_without_a_key() {
    let router = build_router();

    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/signUp/{}", uuid::Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(StatusCode::OK, response.status());
}

#[tokio::test]
async fn metrics_endpoint_exposes_openmetrics_text() {
    let router = build_router();

    let response = router
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(StatusCode::OK, response.status());
}
