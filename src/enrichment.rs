//! Assembly of publish-ready posts.
//!
//! A [`MoviePost`] joins one [`RawPost`] with its flattened comment thread and
//! the title of the movie whose search produced it.

use serde::Serialize;

use crate::error::Result;
use crate::forum::RawPost;

/// An enriched forum post, serialized with camelCase keys.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoviePost {
    pub search_title: String,
    pub title: String,
    pub author: String,
    pub score: i64,
    pub num_comments: i64,
    pub url: String,
    pub comments: String,
    pub content: String,
}

impl MoviePost {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Merge a search hit with its comments and originating title.
pub fn assemble(post: RawPost, comments: String, search_title: &str) -> MoviePost {
    MoviePost {
        search_title: search_title.to_string(),
        title: post.title,
        author: post.author,
        score: post.score,
        num_comments: post.num_comments,
        url: post.url,
        comments,
        content: post.selftext,
    }
}
