//! Typed records for the forum API responses.
//!
//! Children of a listing are kept as raw [`serde_json::Value`] until they are
//! decoded one by one, so a malformed child only affects itself.

use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Appended after every comment body in an aggregated comment blob.
pub const COMMENT_SEPARATOR: &str = " | ";

// ---------------------------------------------------------------------------
// Wire shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: Option<String>,
}

/// `{"data": {"children": [...]}}`, the envelope used by search results and
/// comment trees alike.
#[derive(Debug, Deserialize)]
pub(crate) struct Listing<T> {
    pub data: ListingData<T>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListingData<T> {
    #[serde(default = "Vec::new")]
    pub children: Vec<T>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Thing {
    #[serde(default)]
    pub data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct CommentChild {
    data: Option<CommentData>,
}

#[derive(Debug, Deserialize)]
struct CommentData {
    body: Option<serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Domain records
// ---------------------------------------------------------------------------

/// One search hit, as returned by the forum, before enrichment.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawPost {
    pub id: String,
    pub title: String,
    pub author: String,
    pub score: i64,
    pub num_comments: i64,
    pub url: String,
    pub selftext: String,
}

/// A single search invocation. The correlation id only tags log lines.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub movie_title: String,
    pub correlation_id: Uuid,
}

impl SearchRequest {
    pub fn new(movie_title: impl Into<String>) -> Self {
        Self {
            movie_title: movie_title.into(),
            correlation_id: Uuid::new_v4(),
        }
    }
}

/// Lazy sequence of posts from one search response.
///
/// Yields exactly one item per `data.children` entry, in response order. Each
/// child is decoded only when reached; a child that is not an object or lacks
/// a required field yields [`Error::Parse`] without affecting its siblings.
/// Consuming, not restartable.
#[derive(Debug)]
pub struct SearchResults {
    children: std::vec::IntoIter<serde_json::Value>,
}

impl SearchResults {
    /// Decode the listing envelope of a search response body.
    pub fn from_body(body: &str) -> Result<Self> {
        let listing: Listing<serde_json::Value> = serde_json::from_str(body)
            .map_err(|e| Error::Parse(format!("search response: {e}")))?;

        Ok(Self {
            children: listing.data.children.into_iter(),
        })
    }

    /// An empty sequence, used when a search is abandoned.
    pub fn empty() -> Self {
        Self {
            children: Vec::new().into_iter(),
        }
    }
}

impl Iterator for SearchResults {
    type Item = Result<RawPost>;

    fn next(&mut self) -> Option<Self::Item> {
        self.children.next().map(|child| {
            let thing: Thing = serde_json::from_value(child)
                .map_err(|e| Error::Parse(format!("search result: {e}")))?;
            serde_json::from_value::<RawPost>(thing.data)
                .map_err(|e| Error::Parse(format!("search result: {e}")))
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.children.size_hint()
    }
}

impl ExactSizeIterator for SearchResults {}

/// Flatten a comment-tree response into `body | body | ...`.
///
/// The response is a two-element array whose second element is a listing of
/// comment nodes. Every node with a non-null `data.body` contributes its body
/// followed by [`COMMENT_SEPARATOR`]; non-string bodies are rendered as JSON
/// text. Anything malformed yields `""`.
pub fn flatten_comments(body: &str) -> String {
    let tree = match serde_json::from_str::<Vec<serde_json::Value>>(body) {
        Ok(tree) => tree,
        Err(e) => {
            warn!(error = %e, "Error parsing comments response");
            return String::new();
        }
    };

    let Some(comments) = tree.into_iter().nth(1) else {
        warn!("Comments response has no comment listing");
        return String::new();
    };

    let listing = match serde_json::from_value::<Listing<serde_json::Value>>(comments) {
        Ok(listing) => listing,
        Err(e) => {
            warn!(error = %e, "Error parsing comment listing");
            return String::new();
        }
    };

    let mut flattened = String::new();
    for node in listing.data.children {
        let Ok(CommentChild {
            data: Some(CommentData { body: Some(body) }),
        }) = serde_json::from_value(node)
        else {
            continue;
        };

        match body {
            serde_json::Value::Null => continue,
            serde_json::Value::String(text) => flattened.push_str(&text),
            other => flattened.push_str(&other.to_string()),
        }
        flattened.push_str(COMMENT_SEPARATOR);
    }
    flattened
}
