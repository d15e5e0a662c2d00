//! Title extraction from a "popular movies" response.

use serde::Deserialize;
use tracing::warn;

#[derive(Debug, Deserialize)]
struct PopularMovies {
    results: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct PopularEntry {
    title: Option<String>,
}

/// Lazily yield the `results[].title` values of a popular-movies body.
///
/// A body that is not JSON or lacks `results` yields nothing. Each entry is
/// decoded on its own; entries without a string `title` are skipped.
pub fn extract_titles(body: &str) -> impl Iterator<Item = String> {
    let entries = match serde_json::from_str::<PopularMovies>(body) {
        Ok(parsed) => parsed.results,
        Err(e) => {
            warn!(error = %e, "Error extracting movie titles from response");
            Vec::new()
        }
    };

    entries.into_iter().filter_map(|entry| {
        match serde_json::from_value::<PopularEntry>(entry) {
            Ok(PopularEntry { title: Some(title) }) => Some(title),
            Ok(PopularEntry { title: None }) => {
                warn!("Popular movie entry has no title; skipping");
                None
            }
            Err(e) => {
                warn!(error = %e, "Unreadable popular movie entry; skipping");
                None
            }
        }
    })
}
