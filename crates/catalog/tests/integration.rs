//! Integration tests for `SpotifyClient` against a local axum stub of the
//! Web API.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;

use tunewatch_catalog::types::TokenResponse;
use tunewatch_catalog::{Authorizer, SpotifyClient, TokenCache};
use tunewatch_common::traits::{CatalogSource, SystemClock};
use tunewatch_common::{Result, WatchError};

struct StaticAuthorizer;

#[async_trait]
impl Authorizer for StaticAuthorizer {
    async fn request_token(&self) -> Result<TokenResponse> {
        Ok(TokenResponse {
            access_token: "test-token".to_string(),
            expires_in: 3600,
        })
    }
}

/// Hands out `token-1`, `token-2`, ... and counts the grants.
struct CountingAuthorizer {
    grants: Arc<AtomicUsize>,
}

#[async_trait]
impl Authorizer for CountingAuthorizer {
    async fn request_token(&self) -> Result<TokenResponse> {
        let n = self.grants.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(TokenResponse {
            access_token: format!("token-{}", n),
            expires_in: 3600,
        })
    }
}

async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    (listener, base)
}

fn serve(listener: TcpListener, app: Router) {
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
}

fn client<A: Authorizer>(base: &str, authorizer: A) -> SpotifyClient<A> {
    SpotifyClient::new(
        reqwest::Client::new(),
        "PL1".to_string(),
        TokenCache::new(authorizer, Arc::new(SystemClock)),
    )
    .with_api_base(format!("{}/v1", base))
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

fn item(added_at: &str, user: &str) -> Value {
    json!({
        "added_at": added_at,
        "added_by": { "id": user },
        "track": { "name": "Song", "uri": "spotify:track:x", "artists": [] }
    })
}

#[tokio::test]
async fn test_fetch_version_marker() {
    async fn playlist(
        Path(id): Path<String>,
        Query(query): Query<HashMap<String, String>>,
        headers: HeaderMap,
    ) -> (StatusCode, Json<Value>) {
        if bearer(&headers) != Some("test-token") {
            return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "no token" })));
        }
        if id != "PL1" || query.get("fields").map(String::as_str) != Some("snapshot_id") {
            return (StatusCode::NOT_FOUND, Json(json!({})));
        }
        (StatusCode::OK, Json(json!({ "snapshot_id": "snap-42" })))
    }

    let (listener, base) = bind().await;
    serve(
        listener,
        Router::new().route("/v1/playlists/{id}", get(playlist)),
    );

    let marker = client(&base, StaticAuthorizer)
        .fetch_version_marker()
        .await
        .unwrap();
    assert_eq!(marker, "snap-42");
}

#[tokio::test]
async fn test_fetch_all_items_follows_pagination() {
    async fn tracks(
        State(next): State<String>,
        Path(id): Path<String>,
        Query(query): Query<HashMap<String, String>>,
    ) -> (StatusCode, Json<Value>) {
        if id != "PL1" {
            return (StatusCode::NOT_FOUND, Json(json!({})));
        }
        let page = if query.get("offset").map(String::as_str) == Some("2") {
            json!({
                "items": [item("2024-01-03T00:00:00Z", "carol")],
                "next": null
            })
        } else {
            json!({
                "items": [
                    item("2024-01-02T00:00:00Z", "bob"),
                    item("2024-01-01T00:00:00Z", "alice")
                ],
                "next": next
            })
        };
        (StatusCode::OK, Json(page))
    }

    let (listener, base) = bind().await;
    let next = format!("{}/v1/playlists/PL1/tracks?offset=2&limit=2", base);
    serve(
        listener,
        Router::new()
            .route("/v1/playlists/{id}/tracks", get(tracks))
            .with_state(next),
    );

    let items = client(&base, StaticAuthorizer)
        .fetch_all_items()
        .await
        .unwrap();
    let who: Vec<_> = items
        .iter()
        .map(|i| i.contributor.as_ref().unwrap().id.as_str())
        .collect();
    // flattened in fetch order; sorting is the diff engine's job
    assert_eq!(who, vec!["bob", "alice", "carol"]);
}

#[tokio::test]
async fn test_unauthorized_drops_cached_token() {
    async fn playlist(
        State(hits): State<Arc<AtomicUsize>>,
        headers: HeaderMap,
    ) -> (StatusCode, Json<Value>) {
        let hit = hits.fetch_add(1, Ordering::SeqCst) + 1;
        // the first token is rejected; anything after it must be a fresh grant
        if hit == 1 || bearer(&headers) == Some("token-1") {
            return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "expired" })));
        }
        (StatusCode::OK, Json(json!({ "snapshot_id": "snap-7" })))
    }

    let hits = Arc::new(AtomicUsize::new(0));
    let (listener, base) = bind().await;
    serve(
        listener,
        Router::new()
            .route("/v1/playlists/{id}", get(playlist))
            .with_state(hits.clone()),
    );

    let grants = Arc::new(AtomicUsize::new(0));
    let client = client(
        &base,
        CountingAuthorizer {
            grants: grants.clone(),
        },
    );

    let err = client.fetch_version_marker().await.unwrap_err();
    assert!(matches!(err, WatchError::Fetch(ref m) if m.contains("401")));
    assert_eq!(grants.load(Ordering::SeqCst), 1);

    let marker = client.fetch_version_marker().await.unwrap();
    assert_eq!(marker, "snap-7");
    assert_eq!(grants.load(Ordering::SeqCst), 2);
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_server_error_is_fetch_error() {
    let (listener, base) = bind().await;
    serve(
        listener,
        Router::new().fallback(|| async {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "error": "busy" })),
            )
        }),
    );

    let err = client(&base, StaticAuthorizer)
        .fetch_version_marker()
        .await
        .unwrap_err();
    assert!(matches!(err, WatchError::Fetch(ref m) if m.contains("503")));

    let err = client(&base, StaticAuthorizer)
        .fetch_all_items()
        .await
        .unwrap_err();
    assert!(matches!(err, WatchError::Fetch(_)));
}

#[tokio::test]
async fn test_garbage_body_is_fetch_error() {
    let (listener, base) = bind().await;
    serve(
        listener,
        Router::new().fallback(|| async { (StatusCode::OK, "not json") }),
    );

    let err = client(&base, StaticAuthorizer)
        .fetch_version_marker()
        .await
        .unwrap_err();
    assert!(matches!(err, WatchError::Fetch(_)));
}
