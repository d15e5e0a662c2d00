//! TMDB catalog client.
//!
//! Features:
//! - Static bearer-token authentication.
//! - Token-bucket rate limiting via [`governor`].
//! - Every successful body is forwarded verbatim to the catalog topic.
//! - Failures never leave [`CatalogClient::fetch`]; they are logged and turn
//!   into `None`.

use std::num::NonZeroU32;

use governor::{Quota, RateLimiter};
use reqwest::Client;
use tracing::{debug, info, warn};

use crate::broker::PublishSink;
use crate::config::CatalogConfig;
use crate::error::{Error, Result};

pub struct CatalogClient {
    client: Client,
    api_token: String,
    topic: String,
    sink: PublishSink,
    rate_limiter: governor::RateLimiter<
        governor::state::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
}

impl CatalogClient {
    /// Create a client publishing fetched bodies to `topic` through `sink`.
    pub fn new(config: &CatalogConfig, topic: impl Into<String>, sink: PublishSink) -> Self {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .unwrap_or_else(|e| {
                warn!("Failed to build HTTP client with timeout: {}", e);
                Client::new()
            });

        let rate = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = RateLimiter::direct(Quota::per_second(rate));

        Self {
            client,
            api_token: config.api_token.clone(),
            topic: topic.into(),
            sink,
            rate_limiter,
        }
    }

    /// Fetch `endpoint` and publish its body to the catalog topic.
    ///
    /// Returns the body on success. Any failure (network, non-2xx status,
    /// unreadable body) is logged and yields `None`.
    pub async fn fetch(&self, endpoint: &str, label: &str) -> Option<String> {
        let result = match self.get(endpoint).await {
            Ok(body) => {
                info!(
                    label,
                    endpoint,
                    bytes = body.len(),
                    topic = %self.topic,
                    "Fetched catalog data"
                );
                self.sink.publish(&self.topic, body.clone());
                Some(body)
            }
            Err(e) => {
                warn!(label, endpoint, error = %e, "Error consuming catalog endpoint");
                None
            }
        };

        debug!(label, endpoint, "Finished consuming catalog endpoint");
        result
    }

    async fn get(&self, endpoint: &str) -> Result<String> {
        self.rate_limiter.until_ready().await;

        let resp = self
            .client
            .get(endpoint)
            .bearer_auth(&self.api_token)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::status(
                status.as_u16(),
                format!("catalog returned {status}: {body}"),
            ));
        }

        Ok(resp.text().await?)
    }
}
