//! The document record indexed and returned by the retrieval engine.

use serde::{Deserialize, Serialize};

/// A Confluence page as delivered by the external scraper.
///
/// Documents are immutable once indexed: a reindex replaces a document and
/// all of its chunks wholesale rather than mutating them in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Stable page identifier.
    pub id: String,
    /// Key of the Confluence space the page lives in.
    pub space_key: String,
    /// Human-readable space name, when the scraper provides one.
    #[serde(default)]
    pub space_name: Option<String>,
    /// Page title.
    pub title: String,
    /// Raw page text.
    pub content: String,
    /// Canonical page URL, used for citations.
    pub url: String,
    /// Last-updated timestamp as reported by the source, verbatim.
    #[serde(default)]
    pub last_updated: String,
    /// Page author, when known.
    #[serde(default)]
    pub author: Option<String>,
    /// Page labels, when present.
    #[serde(default)]
    pub labels: Vec<String>,
}

impl Document {
    /// Convenience constructor for the fields every document must carry.
    pub fn new<S: Into<String>>(id: S, space_key: S, title: S, content: S, url: S) -> Self {
        Self {
            id: id.into(),
            space_key: space_key.into(),
            space_name: None,
            title: title.into(),
            content: content.into(),
            url: url.into(),
            last_updated: String::new(),
            author: None,
            labels: Vec::new(),
        }
    }
}
