//! Shared test harness for integration tests.
//!
//! Every external endpoint (catalog, token exchange, forum) is pointed at one
//! [`MockServer`]; publishing goes to a [`MemoryBroker`].

#![allow(dead_code)]

use std::sync::Arc;

use cinefeed::broker::MemoryBroker;
use cinefeed::config::Config;
use cinefeed::pipeline::Pipeline;
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TOKEN_PATH: &str = "/api/v1/access_token";
pub const POPULAR_PATH: &str = "/3/movie/popular";
pub const GENRE_PATH: &str = "/3/genre/movie/list";
pub const SEARCH_PATH: &str = "/r/movies/search";

/// Config with every endpoint on `server` and a short retry backoff.
pub fn test_config(server: &MockServer) -> Config {
    let base = server.uri();
    let mut config = Config::default();

    config.catalog.api_token = "tmdb-token".into();
    config.catalog.genre_list_url = format!("{base}{GENRE_PATH}");
    config.catalog.popular_movies_url = format!("{base}{POPULAR_PATH}");
    config.catalog.movie_details_url = format!("{base}/3/movie/{{movie_id}}");
    config.catalog.timeout_secs = 5;

    config.forum.token_url = format!("{base}{TOKEN_PATH}");
    config.forum.api_base = base;
    config.forum.client_id = "client".into();
    config.forum.client_secret = "secret".into();
    config.forum.retry_backoff_ms = 10;
    config.forum.timeout_secs = 5;

    config.pipeline.movie_ids = vec![550];
    config
}

/// Build a pipeline publishing into a fresh in-memory broker.
pub fn pipeline(config: &Config) -> (Arc<Pipeline>, Arc<MemoryBroker>) {
    let broker = Arc::new(MemoryBroker::new());
    let pipeline = Arc::new(Pipeline::new(config, broker.clone()));
    (pipeline, broker)
}

/// Answer every token exchange with `token`.
pub async fn mount_token(server: &MockServer, token: &str) {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": token,
            "token_type": "bearer",
            "expires_in": 86400,
            "scope": "*"
        })))
        .mount(server)
        .await;
}

pub fn post_json(id: &str, title: &str) -> Value {
    json!({
        "kind": "t3",
        "data": {
            "id": id,
            "title": title,
            "author": "someone",
            "score": 42,
            "num_comments": 2,
            "url": format!("https://reddit.test/{id}"),
            "selftext": format!("selftext of {id}")
        }
    })
}

pub fn listing(children: Vec<Value>) -> Value {
    json!({ "kind": "Listing", "data": { "children": children } })
}

/// A comment-tree response: the post listing followed by the comment listing.
pub fn comments_json(bodies: &[&str]) -> Value {
    let comments = bodies
        .iter()
        .map(|body| json!({ "kind": "t1", "data": { "body": body } }))
        .collect();
    json!([listing(vec![]), listing(comments)])
}

/// Published post records, parsed.
pub fn published_posts(broker: &MemoryBroker, topic: &str) -> Vec<Value> {
    broker
        .messages(topic)
        .iter()
        .map(|m| serde_json::from_str(m).expect("published post is JSON"))
        .collect()
}
