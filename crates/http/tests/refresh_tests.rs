//! Token refresh behaviour of the admin API client

use dashboard_core::{MemorySessionStore, Router, SessionStore, TokenKey};
use dashboard_http::client::{ApiClient, ApiRequest, error::ClientError};
use futures::future::join_all;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CONCURRENT_REQUESTS: u64 = 5;

struct Harness {
    server: MockServer,
    store: Arc<MemorySessionStore>,
    router: Arc<Router>,
    client: ApiClient,
}

async fn harness(store: MemorySessionStore) -> Harness {
    let server = MockServer::start().await;
    let store = Arc::new(store);
    let router = Arc::new(Router::new(store.clone()));
    let client = ApiClient::builder()
        .base_url(server.uri())
        .session_store(store.clone())
        .navigator(router.clone())
        .build()
        .unwrap();

    Harness {
        server,
        store,
        router,
        client,
    }
}

fn article(id: u64) -> serde_json::Value {
    json!({"id": id, "title": format!("Article {id}"), "content": "body"})
}

async fn mount_articles(server: &MockServer, expired_hits: u64, replay_hits: u64) {
    Mock::given(method("GET"))
        .and(path("/articles/1"))
        .and(header("authorization", "Bearer old-access"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"msg": "Token has expired"})))
        .expect(expired_hits)
        .named("expired token")
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/articles/1"))
        .and(header("authorization", "Bearer new-access"))
        .respond_with(ResponseTemplate::new(200).set_body_json(article(1)))
        .expect(replay_hits)
        .named("refreshed token")
        .mount(server)
        .await;
}

#[tokio::test]
async fn expired_token_is_refreshed_and_request_replayed() {
    let h = harness(MemorySessionStore::with_tokens("old-access", "old-refresh")).await;
    mount_articles(&h.server, 1, 1).await;

    Mock::given(method("POST"))
        .and(path("/refresh"))
        .and(header("authorization", "Bearer old-refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "new-access",
            "refresh_token": "new-refresh"
        })))
        .expect(1)
        .mount(&h.server)
        .await;

    let article = h.client.get_article(1).await.unwrap();
    assert_eq!(article.id, 1);

    assert_eq!(h.store.get(TokenKey::Access).unwrap().as_deref(), Some("new-access"));
    assert_eq!(h.store.get(TokenKey::Refresh).unwrap().as_deref(), Some("new-refresh"));
    assert!(!h.client.refresh_state().is_refreshing());
    assert_eq!(h.router.current().unwrap(), None);
}

#[tokio::test]
async fn refresh_without_rotation_keeps_refresh_token() {
    let h = harness(MemorySessionStore::with_tokens("old-access", "old-refresh")).await;
    mount_articles(&h.server, 1, 1).await;

    Mock::given(method("POST"))
        .and(path("/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "new-access"})))
        .expect(1)
        .mount(&h.server)
        .await;

    h.client.get_article(1).await.unwrap();

    assert_eq!(h.store.get(TokenKey::Access).unwrap().as_deref(), Some("new-access"));
    assert_eq!(h.store.get(TokenKey::Refresh).unwrap().as_deref(), Some("old-refresh"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_401s_share_one_refresh() {
    let h = harness(MemorySessionStore::with_tokens("old-access", "old-refresh")).await;
    mount_articles(&h.server, CONCURRENT_REQUESTS, CONCURRENT_REQUESTS).await;

    // Slow enough that every request is rejected while the exchange is running
    Mock::given(method("POST"))
        .and(path("/refresh"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access_token": "new-access", "refresh_token": "new-refresh"}))
                .set_delay(Duration::from_millis(500)),
        )
        .expect(1)
        .mount(&h.server)
        .await;

    let tasks = (0..CONCURRENT_REQUESTS).map(|_| {
        let client = h.client.clone();
        tokio::spawn(async move { client.get_article(1).await })
    });
    let results = join_all(tasks).await;

    for result in results {
        let article = result.unwrap().unwrap();
        assert_eq!(article.title, "Article 1");
    }
    assert_eq!(h.store.get(TokenKey::Refresh).unwrap().as_deref(), Some("new-refresh"));
    assert_eq!(h.client.refresh_state().queued(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn failed_refresh_rejects_every_waiter_and_logs_out() {
    let h = harness(MemorySessionStore::with_tokens("old-access", "old-refresh")).await;
    mount_articles(&h.server, CONCURRENT_REQUESTS, 0).await;

    Mock::given(method("POST"))
        .and(path("/refresh"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({"message": "Token has been revoked"}))
                .set_delay(Duration::from_millis(500)),
        )
        .expect(1)
        .mount(&h.server)
        .await;

    let tasks = (0..CONCURRENT_REQUESTS).map(|_| {
        let client = h.client.clone();
        tokio::spawn(async move { client.get_article(1).await })
    });
    let results = join_all(tasks).await;

    for result in results {
        let err = result.unwrap().unwrap_err();
        assert_eq!(
            err,
            ClientError::AuthenticationFailed("Token has been revoked".into())
        );
    }
    assert_eq!(h.store.access_token().unwrap(), None);
    assert_eq!(h.store.refresh_token().unwrap(), None);
    assert_eq!(h.router.current().unwrap().as_deref(), Some("/login"));
    assert!(!h.client.refresh_state().is_refreshing());
}

#[tokio::test]
async fn server_error_from_refresh_is_propagated() {
    let h = harness(MemorySessionStore::with_tokens("old-access", "old-refresh")).await;
    mount_articles(&h.server, 1, 0).await;

    Mock::given(method("POST"))
        .and(path("/refresh"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .expect(1)
        .mount(&h.server)
        .await;

    let err = h.client.get_article(1).await.unwrap_err();
    assert_eq!(
        err,
        ClientError::ServerError {
            status: 502,
            message: "bad gateway".into()
        }
    );
    assert!(!h.store.presence().unwrap().has_refresh);
    assert_eq!(h.router.current().unwrap().as_deref(), Some("/login"));
}

#[tokio::test]
async fn missing_refresh_token_logs_out_without_calling_refresh() {
    let store = MemorySessionStore::new();
    store.set(TokenKey::Access, "old-access").unwrap();
    let h = harness(store).await;
    mount_articles(&h.server, 1, 0).await;

    Mock::given(path("/refresh"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&h.server)
        .await;

    // The original 401 is handed back, body and all
    let err = h.client.get_article(1).await.unwrap_err();
    assert_eq!(
        err,
        ClientError::AuthenticationFailed(r#"{"msg":"Token has expired"}"#.into())
    );
    assert!(!h.client.refresh_state().is_refreshing());
    assert_eq!(h.store.access_token().unwrap(), None);
    assert_eq!(h.router.current().unwrap().as_deref(), Some("/login"));
}

#[tokio::test]
async fn rejected_refresh_call_never_refreshes_itself() {
    let h = harness(MemorySessionStore::with_tokens("old-access", "old-refresh")).await;

    // Only the caller's own request reaches /refresh
    Mock::given(method("POST"))
        .and(path("/refresh"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&h.server)
        .await;

    let err = h
        .client
        .send(ApiRequest::post("/refresh"))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::SessionExpired(_)), "{err:?}");
    assert!(!h.client.refresh_state().is_refreshing());
    assert_eq!(h.store.refresh_token().unwrap(), None);
    assert_eq!(h.router.current().unwrap().as_deref(), Some("/login"));
}

#[tokio::test]
async fn replayed_request_is_not_retried_twice() {
    let h = harness(MemorySessionStore::with_tokens("old-access", "old-refresh")).await;

    Mock::given(method("GET"))
        .and(path("/profile"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "Admin not allowed"})))
        .expect(2)
        .mount(&h.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "new-access"})))
        .expect(1)
        .mount(&h.server)
        .await;

    let err = h.client.get_profile().await.unwrap_err();
    assert_eq!(err, ClientError::AuthenticationFailed("Admin not allowed".into()));

    // The refresh itself succeeded, so the session stays
    assert_eq!(h.store.access_token().unwrap().as_deref(), Some("new-access"));
    assert_eq!(h.router.current().unwrap(), None);
}

#[tokio::test]
async fn later_requests_use_the_refreshed_token() {
    let h = harness(MemorySessionStore::with_tokens("old-access", "old-refresh")).await;
    mount_articles(&h.server, 1, 2).await;

    Mock::given(method("POST"))
        .and(path("/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "new-access"})))
        .expect(1)
        .mount(&h.server)
        .await;

    h.client.get_article(1).await.unwrap();
    // The stored token is already the new one; no second refresh
    h.client.get_article(1).await.unwrap();
}
