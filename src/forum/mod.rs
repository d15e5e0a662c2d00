//! Forum (Reddit) side of the pipeline.
//!
//! - [`token`] -- client-credentials exchange and optional token sharing.
//! - [`client`] -- subforum search with retry, comment-thread fetches.
//! - [`gate`] -- bounded connection gate shared by all forum requests.
//! - [`types`] -- typed response records and comment flattening.

pub mod client;
pub mod gate;
pub mod token;
pub mod types;

pub use client::ForumClient;
pub use token::{AccessToken, TokenManager};
pub use types::{flatten_comments, RawPost, SearchRequest, SearchResults, COMMENT_SEPARATOR};
