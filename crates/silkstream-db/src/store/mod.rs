//! Key-value store abstraction
//!
//! Records are schemaless JSON objects keyed by a single string attribute.
//! Scans walk raw items in fixed-size pages and apply the filter afterwards,
//! so a page may come back with fewer matches than its size (or none at all)
//! while still carrying a continuation cursor.

#[cfg(feature = "dynamodb")]
pub mod dynamo;
pub mod memory;

use async_trait::async_trait;
use serde_json::{Map, Value};
use silkstream_core::models::ScanCursor;

use crate::error::StoreResult;

/// One stored record.
pub type Item = Map<String, Value>;

/// The record collections the catalog keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Videos,
    Tags,
    Favorites,
}

impl Collection {
    /// Name of the primary-key attribute.
    pub fn key_attribute(self) -> &'static str {
        match self {
            Collection::Videos => "id",
            Collection::Tags => "tag",
            Collection::Favorites => "videoId",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Collection::Videos => "videos",
            Collection::Tags => "tags",
            Collection::Favorites => "favorites",
        }
    }
}

/// Scan filter predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Substring match on a string attribute, or element match on a list attribute.
    Contains { attribute: String, value: String },
    /// Exact match on a string attribute.
    Equals { attribute: String, value: String },
    /// Every nested filter must match.
    All(Vec<Filter>),
}

impl Filter {
    pub fn contains(attribute: &str, value: impl Into<String>) -> Self {
        Filter::Contains {
            attribute: attribute.to_string(),
            value: value.into(),
        }
    }

    pub fn equals(attribute: &str, value: impl Into<String>) -> Self {
        Filter::Equals {
            attribute: attribute.to_string(),
            value: value.into(),
        }
    }

    /// Collapse a list of filters: `None` when empty, the filter itself when single.
    pub fn all(mut filters: Vec<Filter>) -> Option<Self> {
        match filters.len() {
            0 => None,
            1 => filters.pop(),
            _ => Some(Filter::All(filters)),
        }
    }

    /// Evaluate against an item in memory.
    pub fn matches(&self, item: &Item) -> bool {
        match self {
            Filter::Contains { attribute, value } => match item.get(attribute) {
                Some(Value::String(s)) => s.contains(value.as_str()),
                Some(Value::Array(values)) => values
                    .iter()
                    .any(|v| v.as_str() == Some(value.as_str())),
                _ => false,
            },
            Filter::Equals { attribute, value } => {
                item.get(attribute).and_then(Value::as_str) == Some(value.as_str())
            }
            Filter::All(filters) => filters.iter().all(|f| f.matches(item)),
        }
    }
}

/// Field-level partial update. Missing records are created.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    /// Attributes overwritten with the given values.
    pub set: Item,
    /// Numeric attributes atomically incremented, starting from zero when absent.
    pub increments: Vec<(String, i64)>,
}

impl Update {
    pub fn set(mut self, attribute: &str, value: impl Into<Value>) -> Self {
        self.set.insert(attribute.to_string(), value.into());
        self
    }

    pub fn increment(mut self, attribute: &str, delta: i64) -> Self {
        self.increments.push((attribute.to_string(), delta));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.increments.is_empty()
    }
}

/// One page of raw scan output after filtering.
#[derive(Debug, Clone, Default)]
pub struct ScanPage {
    pub items: Vec<Item>,
    /// Resume point; `None` once the collection is exhausted.
    pub next_cursor: Option<ScanCursor>,
}

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Insert or replace a whole record. The item must carry the key attribute.
    async fn put(&self, collection: Collection, item: Item) -> StoreResult<()>;

    async fn get(&self, collection: Collection, key: &str) -> StoreResult<Option<Item>>;

    /// Apply a partial update and return the record as stored afterwards.
    async fn update(&self, collection: Collection, key: &str, update: Update) -> StoreResult<Item>;

    /// Delete a record. Deleting a missing key is not an error.
    async fn delete(&self, collection: Collection, key: &str) -> StoreResult<()>;

    /// Read up to `limit` raw items after `cursor`, returning those matching `filter`.
    async fn scan(
        &self,
        collection: Collection,
        filter: Option<&Filter>,
        limit: usize,
        cursor: Option<&ScanCursor>,
    ) -> StoreResult<ScanPage>;

    fn backend_name(&self) -> &'static str;
}

/// Follow scan cursors until the collection is exhausted.
pub async fn scan_all(
    store: &dyn KeyValueStore,
    collection: Collection,
    filter: Option<&Filter>,
    page_size: usize,
) -> StoreResult<Vec<Item>> {
    let mut items = Vec::new();
    let mut cursor: Option<ScanCursor> = None;

    loop {
        let page = store
            .scan(collection, filter, page_size, cursor.as_ref())
            .await?;
        items.extend(page.items);
        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    Ok(items)
}
