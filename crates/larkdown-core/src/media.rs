//! Lazily resolved media references
//!
//! Image and file nodes are created before their bytes exist anywhere the
//! Markdown can point at. They carry a [`MediaData`] capability that fetches
//! the bytes on demand, and a [`Destination`] that is filled in exactly once
//! by whoever packages those bytes.

use std::fmt;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Errors reported by a [`MediaSource`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("fetch cancelled")]
    Cancelled,

    #[error("media unavailable: {0}")]
    Unavailable(String),

    #[error("fetch failed: {0}")]
    Failed(String),
}

impl FetchError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, FetchError::Cancelled)
    }
}

/// Fetched media bytes
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Media {
    pub bytes: Vec<u8>,
}

impl Media {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

/// A host-provided capability that yields the bytes of an image or file.
///
/// Implementations should return [`FetchError::Cancelled`] once `cancel`
/// fires instead of reporting a failure.
#[async_trait]
pub trait MediaSource: Send + Sync {
    async fn fetch(&self, cancel: CancellationToken) -> Result<Media, FetchError>;
}

/// Capability and naming data attached to an image or file node
#[derive(Clone)]
pub struct MediaData {
    /// Suggested file name
    pub name: String,
    /// Host token identifying the media
    pub token: String,
    pub source: Arc<dyn MediaSource>,
}

impl MediaData {
    pub fn new(
        name: impl Into<String>,
        token: impl Into<String>,
        source: Arc<dyn MediaSource>,
    ) -> Self {
        Self {
            name: name.into(),
            token: token.into(),
            source,
        }
    }

    pub async fn fetch(&self, cancel: CancellationToken) -> Result<Media, FetchError> {
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }
        self.source.fetch(cancel).await
    }
}

impl fmt::Debug for MediaData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaData")
            .field("name", &self.name)
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}

impl PartialEq for MediaData {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.token == other.token
    }
}

/// Returned when a [`Destination`] is resolved a second time
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("destination already resolved to {0}")]
pub struct AlreadyResolved(pub String);

/// A link or image target that is either known up front or resolved later.
///
/// Clones share the same slot, so resolving the copy kept in a media list
/// updates the node inside the tree. The transition from pending to resolved
/// happens at most once.
#[derive(Clone, Default)]
pub struct Destination(Arc<OnceLock<String>>);

impl Destination {
    /// A destination that still has to be resolved
    pub fn pending() -> Self {
        Self::default()
    }

    /// A destination known at construction time
    pub fn resolved(url: impl Into<String>) -> Self {
        Self(Arc::new(OnceLock::from(url.into())))
    }

    pub fn get(&self) -> Option<&str> {
        self.0.get().map(String::as_str)
    }

    pub fn is_resolved(&self) -> bool {
        self.0.get().is_some()
    }

    pub fn resolve(&self, url: impl Into<String>) -> Result<(), AlreadyResolved> {
        self.0.set(url.into()).map_err(|_| {
            AlreadyResolved(self.get().unwrap_or_default().to_string())
        })
    }
}

impl PartialEq for Destination {
    fn eq(&self, other: &Self) -> bool {
        self.get() == other.get()
    }
}

impl Eq for Destination {}

impl fmt::Debug for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Some(url) => f.debug_tuple("Resolved").field(&url).finish(),
            None => f.write_str("Pending"),
        }
    }
}

impl From<&str> for Destination {
    fn from(url: &str) -> Self {
        Destination::resolved(url)
    }
}

impl From<String> for Destination {
    fn from(url: String) -> Self {
        Destination::resolved(url)
    }
}
