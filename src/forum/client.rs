//! Forum (Reddit) data client: subforum search and comment threads.
//!
//! Every request goes through one shared [`ConnectionGate`]. Searches are
//! retried with a fixed backoff; comment fetches never fail their caller.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::USER_AGENT;
use reqwest::Client;
use tracing::{debug, info, warn};

use super::gate::ConnectionGate;
use super::token::AccessToken;
use super::types::{flatten_comments, SearchRequest, SearchResults};
use crate::config::ForumConfig;
use crate::error::{Error, Result};

pub struct ForumClient {
    client: Client,
    api_base: String,
    subreddit: String,
    user_agent: String,
    search_limit: String,
    max_attempts: u32,
    retry_backoff: Duration,
    gate: Arc<ConnectionGate>,
}

impl ForumClient {
    /// Create a client with its own connection gate.
    pub fn new(config: &ForumConfig) -> Self {
        Self::with_gate(config, Arc::new(ConnectionGate::new(&config.pool)))
    }

    /// Create a client whose requests go through `gate`.
    pub fn with_gate(config: &ForumConfig, gate: Arc<ConnectionGate>) -> Self {
        let client = Client::builder()
            .timeout(config.timeout())
            .pool_max_idle_per_host(config.pool.max_connections)
            .build()
            .unwrap_or_else(|e| {
                warn!("Failed to build HTTP client with timeout: {}", e);
                Client::new()
            });

        Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            subreddit: config.subreddit.clone(),
            user_agent: config.user_agent.clone(),
            search_limit: config.search_limit.to_string(),
            max_attempts: config.max_attempts.max(1),
            retry_backoff: config.retry_backoff(),
            gate,
        }
    }

    /// Search the subforum for `request.movie_title`, newest first.
    ///
    /// The request is attempted up to `max_attempts` times with a fixed sleep
    /// in between; the last error is returned once attempts run out. A 401 is
    /// returned at once, since retrying with the same token cannot succeed.
    pub async fn search(
        &self,
        request: &SearchRequest,
        token: &AccessToken,
    ) -> Result<SearchResults> {
        let url = format!("{}/r/{}/search", self.api_base, self.subreddit);
        let query = [
            ("q", request.movie_title.as_str()),
            ("sort", "new"),
            ("limit", self.search_limit.as_str()),
            ("restrict_sr", "true"),
        ];

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            debug!(
                correlation_id = %request.correlation_id,
                title = %request.movie_title,
                attempt,
                "Fetching posts"
            );

            let result = match self.get_text(&url, &query, token).await {
                Ok(body) => SearchResults::from_body(&body),
                Err(e) => Err(e),
            };

            match result {
                Ok(results) => {
                    info!(
                        correlation_id = %request.correlation_id,
                        title = %request.movie_title,
                        posts = results.len(),
                        "Search returned posts"
                    );
                    return Ok(results);
                }
                Err(e) if attempt < self.max_attempts && !e.is_unauthorized() => {
                    warn!(
                        correlation_id = %request.correlation_id,
                        title = %request.movie_title,
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %e,
                        "Search failed, backing off"
                    );
                    tokio::time::sleep(self.retry_backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Fetch and flatten the comment thread of `post_id`.
    ///
    /// Any failure is logged and yields an empty string.
    pub async fn fetch_comments(&self, post_id: &str, token: &AccessToken) -> String {
        let url = format!("{}/comments/{}", self.api_base, post_id);
        debug!(post_id, "Fetching comments");

        match self.get_text(&url, &[], token).await {
            Ok(body) => flatten_comments(&body),
            Err(e) => {
                warn!(post_id, error = %e, "Error fetching comments");
                String::new()
            }
        }
    }

    async fn get_text(
        &self,
        url: &str,
        query: &[(&str, &str)],
        token: &AccessToken,
    ) -> Result<String> {
        let _permit = self.gate.acquire().await?;

        let resp = self
            .client
            .get(url)
            .query(query)
            .bearer_auth(token.as_str())
            .header(USER_AGENT, &self.user_agent)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::status(
                status.as_u16(),
                format!("forum returned {status}: {body}"),
            ));
        }

        Ok(resp.text().await?)
    }
}
