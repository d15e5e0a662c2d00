//! Catalog (TMDB) side of the pipeline.
//!
//! - [`client`] -- [`CatalogClient`], fetches raw endpoint bodies and forwards
//!   them to the catalog topic.
//! - [`titles`] -- pulls movie titles out of a "popular movies" body.

pub mod client;
pub mod titles;

pub use client::CatalogClient;
pub use titles::extract_titles;

/// Substitute `{movie_id}` in a movie-details endpoint template.
pub fn details_endpoint(template: &str, movie_id: u64) -> String {
    template.replace("{movie_id}", &movie_id.to_string())
}
