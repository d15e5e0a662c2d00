//! Ingestion orchestration.
//!
//! A run has three independent branches, each spawned as its own task:
//!
//! 1. **genre** -- fetch the genre list (published by the catalog client).
//! 2. **popular** -- fetch popular movies, extract titles, and for every title
//!    search the forum, fetch each post's comments, assemble and publish.
//! 3. **details** -- fetch the details of every configured movie id.
//!
//! Fan-out over titles and over posts within a title is bounded by
//! `pipeline.max_in_flight_titles` and `pipeline.max_in_flight_posts`. Within
//! one post, comment fetch, assembly and publish happen strictly in that
//! order; nothing is ordered across posts or titles.

pub mod run;

use std::sync::Arc;

use futures::future::join_all;
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::broker::{Broker, PublishSink};
use crate::catalog::{details_endpoint, extract_titles, CatalogClient};
use crate::config::Config;
use crate::enrichment::assemble;
use crate::error::Result;
use crate::forum::gate::ConnectionGate;
use crate::forum::{AccessToken, ForumClient, RawPost, SearchRequest, SearchResults, TokenManager};

pub use run::{IngestionReport, IngestionRun, PopularOutcome, TitleOutcome};

struct Endpoints {
    genre_list: String,
    popular_movies: String,
    movie_details: String,
}

/// Everything one ingestion run needs, shared by all of its tasks.
pub struct Pipeline {
    catalog: CatalogClient,
    tokens: TokenManager,
    forum: ForumClient,
    sink: PublishSink,
    endpoints: Endpoints,
    posts_topic: String,
    max_in_flight_titles: usize,
    max_in_flight_posts: usize,
}

impl Pipeline {
    pub fn new(config: &Config, broker: Arc<dyn Broker>) -> Self {
        let sink = PublishSink::new(broker);
        let gate = Arc::new(ConnectionGate::new(&config.forum.pool));

        Self {
            catalog: CatalogClient::new(
                &config.catalog,
                config.broker.catalog_topic.clone(),
                sink.clone(),
            ),
            tokens: TokenManager::with_gate(&config.forum, Arc::clone(&gate)),
            forum: ForumClient::with_gate(&config.forum, gate),
            sink,
            endpoints: Endpoints {
                genre_list: config.catalog.genre_list_url.clone(),
                popular_movies: config.catalog.popular_movies_url.clone(),
                movie_details: config.catalog.movie_details_url.clone(),
            },
            posts_topic: config.broker.posts_topic.clone(),
            max_in_flight_titles: config.pipeline.max_in_flight_titles.max(1),
            max_in_flight_posts: config.pipeline.max_in_flight_posts.max(1),
        }
    }

    pub fn sink(&self) -> &PublishSink {
        &self.sink
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    /// Spawn the three branches of a run and return immediately.
    pub fn start(self: &Arc<Self>, movie_ids: Vec<u64>) -> IngestionRun {
        let run_id = Uuid::new_v4();
        info!(run_id = %run_id, movie_ids = ?movie_ids, "Starting ingestion run");

        let genre = {
            let pipeline = Arc::clone(self);
            tokio::spawn(async move { pipeline.fetch_genres().await })
        };
        let popular = {
            let pipeline = Arc::clone(self);
            tokio::spawn(async move { pipeline.fetch_popular_and_search().await })
        };
        let details = {
            let pipeline = Arc::clone(self);
            tokio::spawn(async move { pipeline.fetch_details(&movie_ids).await })
        };

        IngestionRun {
            run_id,
            genre,
            popular,
            details,
        }
    }

    async fn fetch_genres(&self) -> bool {
        self.catalog
            .fetch(&self.endpoints.genre_list, "Genre List")
            .await
            .is_some()
    }

    async fn fetch_popular_and_search(&self) -> PopularOutcome {
        let Some(body) = self
            .catalog
            .fetch(&self.endpoints.popular_movies, "Popular Movies")
            .await
        else {
            return PopularOutcome::default();
        };

        let outcomes: Vec<TitleOutcome> = stream::iter(extract_titles(&body))
            .map(|title| self.search_and_publish(title))
            .buffer_unordered(self.max_in_flight_titles)
            .collect()
            .await;

        let mut posts = TitleOutcome::default();
        for outcome in &outcomes {
            posts += *outcome;
        }

        PopularOutcome {
            fetched: true,
            titles: outcomes.len(),
            posts,
        }
    }

    async fn fetch_details(&self, movie_ids: &[u64]) -> usize {
        let fetches = movie_ids.iter().map(|&movie_id| async move {
            let endpoint = details_endpoint(&self.endpoints.movie_details, movie_id);
            self.catalog.fetch(&endpoint, "Movie Details").await.is_some()
        });

        join_all(fetches).await.into_iter().filter(|ok| *ok).count()
    }

    /// Search the forum for one title and publish every enriched post.
    ///
    /// Never fails: a failed token exchange or an exhausted search degrades to
    /// zero posts for this title.
    pub async fn search_and_publish(&self, title: String) -> TitleOutcome {
        let request = SearchRequest::new(title);
        info!(
            correlation_id = %request.correlation_id,
            title = %request.movie_title,
            "Starting search"
        );

        let outcome = match self.tokens.token().await {
            Ok(token) => {
                let results = self.search(&request, &token).await;
                self.publish_posts(&request, &token, results).await
            }
            Err(e) => {
                warn!(
                    correlation_id = %request.correlation_id,
                    title = %request.movie_title,
                    error = %e,
                    "Could not obtain forum token; skipping title"
                );
                TitleOutcome::default()
            }
        };

        info!(
            correlation_id = %request.correlation_id,
            title = %request.movie_title,
            posts_sent = outcome.posts_sent,
            posts_skipped = outcome.posts_skipped,
            "Search completed"
        );
        outcome
    }

    async fn search(&self, request: &SearchRequest, token: &AccessToken) -> SearchResults {
        match self.forum.search(request, token).await {
            Ok(results) => results,
            Err(e) => {
                if e.is_unauthorized() {
                    self.tokens.invalidate(token).await;
                }
                warn!(
                    correlation_id = %request.correlation_id,
                    title = %request.movie_title,
                    error = %e,
                    "Search abandoned; continuing with no posts"
                );
                SearchResults::empty()
            }
        }
    }

    async fn publish_posts(
        &self,
        request: &SearchRequest,
        token: &AccessToken,
        results: SearchResults,
    ) -> TitleOutcome {
        let published: Vec<bool> = stream::iter(results)
            .map(|item| self.enrich_and_publish(request, token, item))
            .buffer_unordered(self.max_in_flight_posts)
            .collect()
            .await;

        let posts_sent = published.iter().filter(|sent| **sent).count();
        TitleOutcome {
            posts_sent,
            posts_skipped: published.len() - posts_sent,
        }
    }

    async fn enrich_and_publish(
        &self,
        request: &SearchRequest,
        token: &AccessToken,
        item: Result<RawPost>,
    ) -> bool {
        let raw = match item {
            Ok(raw) => raw,
            Err(e) => {
                warn!(
                    correlation_id = %request.correlation_id,
                    error = %e,
                    "Skipping unreadable post"
                );
                return false;
            }
        };

        let comments = self.forum.fetch_comments(&raw.id, token).await;
        let post = assemble(raw, comments, &request.movie_title);

        match post.to_json() {
            Ok(json) => {
                debug!(
                    correlation_id = %request.correlation_id,
                    post = %post.title,
                    "Publishing post"
                );
                self.sink.publish(&self.posts_topic, json);
                true
            }
            Err(e) => {
                warn!(
                    correlation_id = %request.correlation_id,
                    post = %post.title,
                    error = %e,
                    "Error converting post to JSON"
                );
                false
            }
        }
    }
}
