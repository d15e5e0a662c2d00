use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub catalog: CatalogConfig,

    #[serde(default)]
    pub forum: ForumConfig,

    #[serde(default)]
    pub broker: BrokerConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Catalog (TMDB) API settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogConfig {
    /// Static bearer token (TMDB "API Read Access Token")
    #[serde(default)]
    pub api_token: String,

    #[serde(default = "default_genre_list_url")]
    pub genre_list_url: String,

    #[serde(default = "default_popular_movies_url")]
    pub popular_movies_url: String,

    /// Must contain the `{movie_id}` placeholder
    #[serde(default = "default_movie_details_url")]
    pub movie_details_url: String,

    #[serde(default = "default_catalog_rate")]
    pub requests_per_second: u32,

    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,
}

fn default_genre_list_url() -> String {
    "https://api.themoviedb.org/3/genre/movie/list".to_string()
}
fn default_popular_movies_url() -> String {
    "https://api.themoviedb.org/3/movie/popular".to_string()
}
fn default_movie_details_url() -> String {
    "https://api.themoviedb.org/3/movie/{movie_id}".to_string()
}
fn default_catalog_rate() -> u32 {
    40
}
fn default_request_timeout() -> u64 {
    30
}

impl CatalogConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            api_token: String::new(),
            genre_list_url: default_genre_list_url(),
            popular_movies_url: default_popular_movies_url(),
            movie_details_url: default_movie_details_url(),
            requests_per_second: default_catalog_rate(),
            timeout_secs: default_request_timeout(),
        }
    }
}

/// How the forum bearer token is reused between searches.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TokenPolicy {
    /// Every search performs its own client-credentials exchange.
    #[default]
    PerSearch,
    /// One cached token shared by all searches, refreshed single-flight.
    Shared,
}

/// Forum (Reddit) API settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ForumConfig {
    #[serde(default = "default_token_url")]
    pub token_url: String,

    #[serde(default = "default_api_base")]
    pub api_base: String,

    #[serde(default = "default_subreddit")]
    pub subreddit: String,

    #[serde(default)]
    pub client_id: String,

    #[serde(default)]
    pub client_secret: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_search_limit")]
    pub search_limit: u32,

    #[serde(default)]
    pub token_policy: TokenPolicy,

    /// Total attempts for one search request, first try included
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Fixed sleep between search attempts
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub pool: PoolConfig,
}

fn default_token_url() -> String {
    "https://www.reddit.com/api/v1/access_token".to_string()
}
fn default_api_base() -> String {
    "https://oauth.reddit.com".to_string()
}
fn default_subreddit() -> String {
    "movies".to_string()
}
fn default_user_agent() -> String {
    concat!("cinefeed/", env!("CARGO_PKG_VERSION")).to_string()
}
fn default_search_limit() -> u32 {
    100
}
fn default_max_attempts() -> u32 {
    3
}
fn default_retry_backoff_ms() -> u64 {
    5_000
}

impl ForumConfig {
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ForumConfig {
    fn default() -> Self {
        Self {
            token_url: default_token_url(),
            api_base: default_api_base(),
            subreddit: default_subreddit(),
            client_id: String::new(),
            client_secret: String::new(),
            user_agent: default_user_agent(),
            search_limit: default_search_limit(),
            token_policy: TokenPolicy::default(),
            max_attempts: default_max_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
            timeout_secs: default_request_timeout(),
            pool: PoolConfig::default(),
        }
    }
}

/// Limits of the connection gate shared by all forum requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PoolConfig {
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    #[serde(default = "default_max_pending")]
    pub max_pending: usize,

    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,
}

fn default_max_connections() -> usize {
    100
}
fn default_max_pending() -> usize {
    1000
}
fn default_acquire_timeout() -> u64 {
    60
}

impl PoolConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            max_pending: default_max_pending(),
            acquire_timeout_secs: default_acquire_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BrokerConfig {
    /// Comma-separated bootstrap servers
    #[serde(default = "default_brokers")]
    pub brokers: String,

    #[serde(default = "default_client_id")]
    pub client_id: String,

    /// Topic receiving raw catalog bodies
    #[serde(default = "default_catalog_topic")]
    pub catalog_topic: String,

    /// Topic receiving enriched posts
    #[serde(default = "default_posts_topic")]
    pub posts_topic: String,

    #[serde(default = "default_message_timeout")]
    pub message_timeout_ms: u64,
}

fn default_brokers() -> String {
    "localhost:9092".to_string()
}
fn default_client_id() -> String {
    "cinefeed".to_string()
}
fn default_catalog_topic() -> String {
    "bigdata-tmdb".to_string()
}
fn default_posts_topic() -> String {
    "bigdata-reddit".to_string()
}
fn default_message_timeout() -> u64 {
    5_000
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            brokers: default_brokers(),
            client_id: default_client_id(),
            catalog_topic: default_catalog_topic(),
            posts_topic: default_posts_topic(),
            message_timeout_ms: default_message_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    /// Movie ids whose details are fetched on every ingestion run
    #[serde(default = "default_movie_ids")]
    pub movie_ids: Vec<u64>,

    #[serde(default = "default_max_in_flight_titles")]
    pub max_in_flight_titles: usize,

    /// Per title
    #[serde(default = "default_max_in_flight_posts")]
    pub max_in_flight_posts: usize,
}

fn default_movie_ids() -> Vec<u64> {
    vec![18, 35, 550]
}
fn default_max_in_flight_titles() -> usize {
    8
}
fn default_max_in_flight_posts() -> usize {
    16
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            movie_ids: default_movie_ids(),
            max_in_flight_titles: default_max_in_flight_titles(),
            max_in_flight_posts: default_max_in_flight_posts(),
        }
    }
}
