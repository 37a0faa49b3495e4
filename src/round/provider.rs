//! Content provider capability
//!
//! The round engine only needs two questions answered: "give me a random
//! item" and "which keywords go with it". Where the content lives (a SQL
//! table of photos, a remote API) is the provider's business; which of the
//! stored keywords make it into a round is decided by [`KeywordSelection`].

use async_trait::async_trait;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A piece of content that can be shown for a round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    /// Provider-specific item id
    pub item_id: String,
    /// URL of the image
    pub content_url: String,
}

/// Source of round content
#[async_trait]
pub trait ContentProvider: Send + Sync {
    /// Pick one random item, or `None` if the catalog is empty
    async fn random_item(&self) -> Result<Option<ContentItem>>;

    /// Every scored keyword stored for an item. May be empty.
    async fn keywords_for(&self, item_id: &str) -> Result<Vec<KeywordCandidate>>;
}

/// A scored keyword as stored alongside an item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordCandidate {
    /// The keyword text
    pub keyword: String,
    /// Confidence from the first tagging source
    #[serde(default)]
    pub primary_confidence: Option<f32>,
    /// Confidence from the second tagging source
    #[serde(default)]
    pub secondary_confidence: Option<f32>,
    /// Whether a user suggested this keyword (untrusted)
    #[serde(default)]
    pub suggested_by_user: bool,
}

impl KeywordCandidate {
    /// Machine-tagged candidate with a primary confidence
    pub fn scored(keyword: impl Into<String>, primary_confidence: f32) -> Self {
        Self {
            keyword: keyword.into(),
            primary_confidence: Some(primary_confidence),
            secondary_confidence: None,
            suggested_by_user: false,
        }
    }
}

/// Rules for turning scored candidates into a round's keyword list
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeywordSelection {
    /// Maximum keywords per round
    pub limit: usize,
    /// A keyword needs a confidence above this from at least one source
    pub min_confidence: f32,
}

impl Default for KeywordSelection {
    fn default() -> Self {
        Self {
            limit: 6,
            min_confidence: 40.0,
        }
    }
}

impl KeywordSelection {
    /// Whether a candidate passes the filters
    pub fn accepts(&self, candidate: &KeywordCandidate) -> bool {
        let confident = |c: Option<f32>| c.is_some_and(|c| c > self.min_confidence);

        (confident(candidate.primary_confidence) || confident(candidate.secondary_confidence))
            && !candidate.suggested_by_user
            && !candidate.keyword.contains(' ')
            && !candidate.keyword.contains('-')
    }

    /// Filter, order by primary confidence (highest first) and cap
    pub fn select(&self, candidates: &[KeywordCandidate]) -> Vec<String> {
        let mut accepted: Vec<&KeywordCandidate> =
            candidates.iter().filter(|c| self.accepts(c)).collect();

        // Missing primary confidence ranks first, as NULL does in a descending
        // SQL sort. Stable for ties.
        accepted.sort_by(|a, b| {
            let a = a.primary_confidence.unwrap_or(f32::INFINITY);
            let b = b.primary_confidence.unwrap_or(f32::INFINITY);
            b.total_cmp(&a)
        });

        accepted
            .into_iter()
            .take(self.limit)
            .map(|c| c.keyword.clone())
            .collect()
    }
}

/// An item together with its scored keywords
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// The item
    #[serde(flatten)]
    pub item: ContentItem,
    /// Every keyword stored for the item
    #[serde(default)]
    pub keywords: Vec<KeywordCandidate>,
}

/// Content provider backed by an in-memory catalog
#[derive(Debug, Clone, Default)]
pub struct InMemoryContentProvider {
    entries: Vec<CatalogEntry>,
}

impl InMemoryContentProvider {
    /// Create a provider over `entries`
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    /// Load a catalog from a JSON array of entries
    pub fn from_json(json: &str) -> Result<Self> {
        let entries: Vec<CatalogEntry> = serde_json::from_str(json)?;
        Ok(Self::new(entries))
    }

    /// Number of items in the catalog
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl ContentProvider for InMemoryContentProvider {
    async fn random_item(&self) -> Result<Option<ContentItem>> {
        let picked = self.entries.choose(&mut rand::rng()).map(|e| e.item.clone());
        Ok(picked)
    }

    async fn keywords_for(&self, item_id: &str) -> Result<Vec<KeywordCandidate>> {
        let entry = self
            .entries
            .iter()
            .find(|e| e.item.item_id == item_id)
            .ok_or_else(|| Error::ContentProvider(format!("unknown item: {item_id}")))?;

        Ok(entry.keywords.clone())
    }
}
