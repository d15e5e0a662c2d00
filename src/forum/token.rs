//! Client-credentials token management for the forum API.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use reqwest::header::USER_AGENT;
use reqwest::Client;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::gate::ConnectionGate;
use super::types::TokenResponse;
use crate::config::{ForumConfig, TokenPolicy};
use crate::error::{Error, Result};

/// Opaque bearer token. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// Obtains bearer tokens through a client-credentials exchange.
///
/// With [`TokenPolicy::PerSearch`] every [`token`](Self::token) call performs
/// a fresh exchange and concurrent callers may exchange redundantly. With
/// [`TokenPolicy::Shared`] the first caller fills a cell that later callers
/// read; the cell's async mutex makes the refresh single-flight.
pub struct TokenManager {
    client: Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    user_agent: String,
    policy: TokenPolicy,
    gate: Arc<ConnectionGate>,
    cached: Mutex<Option<AccessToken>>,
    exchanges: AtomicU64,
}

impl TokenManager {
    /// Create a manager with its own connection gate.
    pub fn new(config: &ForumConfig) -> Self {
        Self::with_gate(config, Arc::new(ConnectionGate::new(&config.pool)))
    }

    /// Create a manager whose exchanges go through `gate`, usually the one
    /// shared with the [`ForumClient`](super::ForumClient).
    pub fn with_gate(config: &ForumConfig, gate: Arc<ConnectionGate>) -> Self {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .unwrap_or_else(|e| {
                warn!("Failed to build HTTP client with timeout: {}", e);
                Client::new()
            });

        Self {
            client,
            token_url: config.token_url.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            user_agent: config.user_agent.clone(),
            policy: config.token_policy,
            gate,
            cached: Mutex::new(None),
            exchanges: AtomicU64::new(0),
        }
    }

    /// Perform one client-credentials exchange.
    ///
    /// Fails with [`Error::Transport`] when the endpoint is unreachable or no
    /// connection slot frees up in time, and with [`Error::Auth`] when it
    /// answers with an error status or a body without `access_token`.
    pub async fn acquire_token(&self) -> Result<AccessToken> {
        self.exchanges.fetch_add(1, Ordering::Relaxed);
        debug!(token_url = %self.token_url, "Requesting forum access token");
        let _permit = self.gate.acquire().await?;

        let resp = self
            .client
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .header(USER_AGENT, &self.user_agent)
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Auth(format!(
                "token endpoint returned {status}: {body}"
            )));
        }

        let body = resp.text().await?;
        parse_token_response(&body)
    }

    /// Return a token according to the configured [`TokenPolicy`].
    pub async fn token(&self) -> Result<AccessToken> {
        match self.policy {
            TokenPolicy::PerSearch => self.acquire_token().await,
            TokenPolicy::Shared => {
                let mut cell = self.cached.lock().await;
                if let Some(token) = cell.as_ref() {
                    return Ok(token.clone());
                }
                let token = self.acquire_token().await?;
                info!("Cached new forum access token");
                *cell = Some(token.clone());
                Ok(token)
            }
        }
    }

    /// Drop the cached token if it is still `stale`, so the next
    /// [`token`](Self::token) call exchanges again.
    pub async fn invalidate(&self, stale: &AccessToken) {
        let mut cell = self.cached.lock().await;
        if cell.as_ref() == Some(stale) {
            debug!("Invalidating rejected forum access token");
            *cell = None;
        }
    }

    /// Number of exchanges attempted so far.
    pub fn exchanges(&self) -> u64 {
        self.exchanges.load(Ordering::Relaxed)
    }

    pub fn policy(&self) -> TokenPolicy {
        self.policy
    }
}

fn parse_token_response(body: &str) -> Result<AccessToken> {
    let parsed: TokenResponse = serde_json::from_str(body)
        .map_err(|e| Error::Auth(format!("unreadable token response: {e}")))?;

    parsed
        .access_token
        .map(AccessToken)
        .ok_or_else(|| Error::Auth("token response has no access_token".into()))
}
