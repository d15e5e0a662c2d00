//! Handles for an in-flight ingestion run.

use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

/// Outcome of the search fan-out for one title.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TitleOutcome {
    /// Posts assembled and handed to the publish sink.
    pub posts_sent: usize,
    /// Posts dropped because of a parse or serialization error.
    pub posts_skipped: usize,
}

impl std::ops::AddAssign for TitleOutcome {
    fn add_assign(&mut self, other: Self) {
        self.posts_sent += other.posts_sent;
        self.posts_skipped += other.posts_skipped;
    }
}

/// Outcome of the popular-movies branch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PopularOutcome {
    pub fetched: bool,
    pub titles: usize,
    pub posts: TitleOutcome,
}

/// Summary of a finished ingestion run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestionReport {
    pub run_id: Uuid,
    pub genres_fetched: bool,
    pub popular_fetched: bool,
    pub titles: usize,
    pub posts_sent: usize,
    pub posts_skipped: usize,
    pub details_fetched: usize,
}

/// One join handle per independent branch of a run.
///
/// Dropping the run detaches the branches; they keep going in the background.
pub struct IngestionRun {
    pub run_id: Uuid,
    pub(crate) genre: JoinHandle<bool>,
    pub(crate) popular: JoinHandle<PopularOutcome>,
    pub(crate) details: JoinHandle<usize>,
}

impl IngestionRun {
    /// Wait for all three branches. A panicked branch counts as empty.
    pub async fn wait(self) -> IngestionReport {
        let run_id = self.run_id;

        let genres_fetched = self.genre.await.unwrap_or_else(|e| {
            warn!(run_id = %run_id, error = %e, "Genre branch aborted");
            false
        });
        let popular = self.popular.await.unwrap_or_else(|e| {
            warn!(run_id = %run_id, error = %e, "Popular branch aborted");
            PopularOutcome::default()
        });
        let details_fetched = self.details.await.unwrap_or_else(|e| {
            warn!(run_id = %run_id, error = %e, "Details branch aborted");
            0
        });

        let report = IngestionReport {
            run_id,
            genres_fetched,
            popular_fetched: popular.fetched,
            titles: popular.titles,
            posts_sent: popular.posts.posts_sent,
            posts_skipped: popular.posts.posts_skipped,
            details_fetched,
        };

        info!(
            run_id = %run_id,
            genres_fetched = report.genres_fetched,
            titles = report.titles,
            posts_sent = report.posts_sent,
            posts_skipped = report.posts_skipped,
            details_fetched = report.details_fetched,
            "Ingestion run finished"
        );

        report
    }
}
