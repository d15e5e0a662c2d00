//! Error taxonomy for the ingestion pipeline.
//!
//! Every fallible pipeline stage returns [`Error`]. Callers decide per stage
//! whether a failure degrades to an empty result or is only logged; nothing in
//! here is fatal to the process.

/// Failure modes of the ingestion pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The token exchange failed or its response could not be understood.
    #[error("Auth error: {0}")]
    Auth(String),

    /// Network failure, timeout, non-success status or connection-gate
    /// exhaustion.
    #[error("Transport error: {message}")]
    Transport {
        /// Human-readable error description.
        message: String,
        /// HTTP status, when the server answered at all.
        status: Option<u16>,
    },

    /// Malformed JSON or a missing expected field.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The broker refused or failed to deliver a message.
    #[error("Publish error [{topic}]: {message}")]
    Publish {
        /// Topic the payload was addressed to.
        topic: String,
        /// Human-readable error description.
        message: String,
    },
}

impl Error {
    /// Convenience constructor for [`Error::Transport`] without a status.
    pub fn transport(message: impl Into<String>) -> Self {
        Error::Transport {
            message: message.into(),
            status: None,
        }
    }

    /// Convenience constructor for [`Error::Transport`] carrying a status.
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Error::Transport {
            message: message.into(),
            status: Some(status),
        }
    }

    /// Convenience constructor for [`Error::Publish`].
    pub fn publish(topic: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Publish {
            topic: topic.into(),
            message: message.into(),
        }
    }

    /// Returns `true` when the remote answered 401, i.e. the bearer token was
    /// rejected.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Error::Transport { status: Some(401), .. })
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => Error::status(status.as_u16(), err.to_string()),
            None => Error::transport(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Parse(err.to_string())
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
