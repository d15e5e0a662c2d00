//! Forum client integration tests: token exchange, search retry, comments.

mod common;

use std::sync::Arc;

use cinefeed::config::{PoolConfig, TokenPolicy};
use cinefeed::forum::gate::ConnectionGate;
use cinefeed::forum::{AccessToken, ForumClient, RawPost, SearchRequest, TokenManager};
use cinefeed::Error;
use common::*;
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// Token exchange
// ============================================================================

#[tokio::test]
async fn test_token_exchange_returns_access_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(header_exists("authorization"))
        .and(body_string_contains("grant_type=client_credentials"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "abc123",
            "token_type": "bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = test_config(&server);
    let tokens = TokenManager::new(&config.forum);

    let token = tokens.acquire_token().await.unwrap();
    assert_eq!(token.as_str(), "abc123");
    assert_eq!(tokens.exchanges(), 1);
}

#[tokio::test]
async fn test_token_response_without_field_is_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "error": "invalid_grant" })))
        .mount(&server)
        .await;

    let config = test_config(&server);
    let err = TokenManager::new(&config.forum).acquire_token().await.unwrap_err();
    assert!(matches!(err, Error::Auth(_)), "got {err:?}");
}

#[tokio::test]
async fn test_token_rejected_credentials_is_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
        .mount(&server)
        .await;

    let config = test_config(&server);
    let err = TokenManager::new(&config.forum).acquire_token().await.unwrap_err();
    assert!(matches!(err, Error::Auth(_)), "got {err:?}");
}

#[tokio::test]
async fn test_token_endpoint_unreachable_is_transport_error() {
    let server = MockServer::start().await;
    let mut config = test_config(&server);
    config.forum.token_url = "http://127.0.0.1:1/api/v1/access_token".into();

    let err = TokenManager::new(&config.forum).acquire_token().await.unwrap_err();
    assert!(matches!(err, Error::Transport { .. }), "got {err:?}");
}

#[tokio::test]
async fn test_token_exchange_waits_for_connection_gate() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access_token": "abc" })))
        .expect(0)
        .mount(&server)
        .await;

    let config = test_config(&server);
    let gate = Arc::new(ConnectionGate::new(&PoolConfig {
        max_connections: 1,
        max_pending: 0,
        acquire_timeout_secs: 1,
    }));
    let tokens = TokenManager::with_gate(&config.forum, Arc::clone(&gate));

    let held = gate.acquire().await.unwrap();
    let err = tokens.acquire_token().await.unwrap_err();
    assert!(matches!(err, Error::Transport { .. }), "got {err:?}");
    assert!(err.to_string().contains("queue full"));
    drop(held);
}

#[tokio::test]
async fn test_per_search_policy_exchanges_every_time() {
    let server = MockServer::start().await;
    mount_token(&server, "fresh").await;

    let config = test_config(&server);
    let tokens = TokenManager::new(&config.forum);
    assert_eq!(tokens.policy(), TokenPolicy::PerSearch);

    tokens.token().await.unwrap();
    tokens.token().await.unwrap();
    assert_eq!(tokens.exchanges(), 2);
}

#[tokio::test]
async fn test_shared_policy_reuses_until_invalidated() {
    let server = MockServer::start().await;
    mount_token(&server, "shared").await;

    let mut config = test_config(&server);
    config.forum.token_policy = TokenPolicy::Shared;
    let tokens = TokenManager::new(&config.forum);

    let (a, b, c) = tokio::join!(tokens.token(), tokens.token(), tokens.token());
    let first = a.unwrap();
    assert_eq!(b.unwrap(), first);
    assert_eq!(c.unwrap(), first);
    assert_eq!(tokens.exchanges(), 1);

    // A token that is no longer cached does not evict the current one.
    tokens.invalidate(&AccessToken::new("other")).await;
    tokens.token().await.unwrap();
    assert_eq!(tokens.exchanges(), 1);

    tokens.invalidate(&first).await;
    tokens.token().await.unwrap();
    assert_eq!(tokens.exchanges(), 2);
}

// ============================================================================
// Search
// ============================================================================

#[tokio::test]
async fn test_search_sends_expected_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(query_param("q", "Inception"))
        .and(query_param("sort", "new"))
        .and(query_param("limit", "100"))
        .and(query_param("restrict_sr", "true"))
        .and(header("authorization", "Bearer tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(vec![
            post_json("a", "First"),
            post_json("b", "Second"),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let config = test_config(&server);
    let forum = ForumClient::new(&config.forum);

    let results = forum
        .search(&SearchRequest::new("Inception"), &AccessToken::new("tok"))
        .await
        .unwrap();

    let titles: Vec<String> = results.map(|post| post.unwrap().title).collect();
    assert_eq!(titles, vec!["First", "Second"]);
}

async fn collect_posts(forum: &ForumClient) -> Vec<RawPost> {
    forum
        .search(&SearchRequest::new("Up"), &AccessToken::new("tok"))
        .await
        .unwrap()
        .map(|post| post.unwrap())
        .collect()
}

#[tokio::test]
async fn test_search_retries_transient_failures() {
    let body = listing(vec![post_json("a", "Only"), post_json("b", "Other")]);

    let immediate = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(body.clone()))
        .expect(1)
        .mount(&immediate)
        .await;
    let expected = collect_posts(&ForumClient::new(&test_config(&immediate).forum)).await;

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .with_priority(1)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(1)
        .mount(&server)
        .await;

    let retried = collect_posts(&ForumClient::new(&test_config(&server).forum)).await;
    assert_eq!(retried.len(), 2);
    assert_eq!(retried, expected);
}

#[tokio::test]
async fn test_search_gives_up_after_three_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let config = test_config(&server);
    let forum = ForumClient::new(&config.forum);

    let err = forum
        .search(&SearchRequest::new("Up"), &AccessToken::new("tok"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Transport { status: Some(503), .. }), "got {err:?}");
}

#[tokio::test]
async fn test_search_rejected_token_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = test_config(&server);
    config.forum.retry_backoff_ms = 5_000;
    let forum = ForumClient::new(&config.forum);

    let err = tokio::time::timeout(
        std::time::Duration::from_secs(2),
        forum.search(&SearchRequest::new("Up"), &AccessToken::new("stale")),
    )
    .await
    .expect("401 should not back off")
    .unwrap_err();
    assert!(err.is_unauthorized(), "got {err:?}");
}

#[tokio::test]
async fn test_search_retries_unreadable_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>busy</html>"))
        .expect(3)
        .mount(&server)
        .await;

    let config = test_config(&server);
    let forum = ForumClient::new(&config.forum);

    let err = forum
        .search(&SearchRequest::new("Up"), &AccessToken::new("tok"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Parse(_)), "got {err:?}");
}

#[tokio::test]
async fn test_malformed_child_only_affects_itself() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(vec![
            post_json("a", "Good"),
            json!({ "kind": "t3", "data": { "id": "b" } }),
            post_json("c", "Also good"),
        ])))
        .mount(&server)
        .await;

    let config = test_config(&server);
    let forum = ForumClient::new(&config.forum);

    let results: Vec<_> = forum
        .search(&SearchRequest::new("Up"), &AccessToken::new("tok"))
        .await
        .unwrap()
        .collect();

    assert_eq!(results.len(), 3);
    assert!(results[0].is_ok());
    assert!(matches!(results[1], Err(Error::Parse(_))));
    assert!(results[2].is_ok());
}

// ============================================================================
// Comments
// ============================================================================

#[tokio::test]
async fn test_comments_flattened_with_separator() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/comments/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(comments_json(&["Great", "Meh"])))
        .mount(&server)
        .await;

    let config = test_config(&server);
    let forum = ForumClient::new(&config.forum);

    let comments = forum.fetch_comments("abc", &AccessToken::new("tok")).await;
    assert_eq!(comments, "Great | Meh | ");
}

#[tokio::test]
async fn test_comment_fetch_failure_is_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/comments/abc"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let config = test_config(&server);
    let forum = ForumClient::new(&config.forum);

    assert_eq!(forum.fetch_comments("abc", &AccessToken::new("tok")).await, "");
}
