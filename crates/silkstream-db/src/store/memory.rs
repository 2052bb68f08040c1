//! In-process store used for local development and tests.
//!
//! Items are held per collection in key order, so scans are deterministic.

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;

use async_trait::async_trait;
use serde_json::Value;
use silkstream_core::models::ScanCursor;
use tokio::sync::RwLock;

use super::{Collection, Filter, Item, KeyValueStore, ScanPage, Update};
use crate::error::{StoreError, StoreResult};

#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<Collection, BTreeMap<String, Item>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records in a collection.
    pub async fn len(&self, collection: Collection) -> usize {
        self.collections
            .read()
            .await
            .get(&collection)
            .map(BTreeMap::len)
            .unwrap_or(0)
    }
}

fn key_of(collection: Collection, item: &Item) -> StoreResult<String> {
    let attribute = collection.key_attribute();
    item.get(attribute)
        .and_then(Value::as_str)
        .map(String::from)
        .ok_or_else(|| StoreError::MissingKey(attribute.to_string()))
}

fn apply_increment(item: &mut Item, attribute: &str, delta: i64) -> StoreResult<()> {
    let current = match item.get(attribute) {
        None | Some(Value::Null) => 0,
        Some(value) => value.as_i64().ok_or_else(|| {
            StoreError::Backend(format!("Attribute '{}' is not an integer", attribute))
        })?,
    };
    item.insert(attribute.to_string(), Value::from(current + delta));
    Ok(())
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn put(&self, collection: Collection, item: Item) -> StoreResult<()> {
        let key = key_of(collection, &item)?;
        self.collections
            .write()
            .await
            .entry(collection)
            .or_default()
            .insert(key, item);
        Ok(())
    }

    async fn get(&self, collection: Collection, key: &str) -> StoreResult<Option<Item>> {
        Ok(self
            .collections
            .read()
            .await
            .get(&collection)
            .and_then(|items| items.get(key))
            .cloned())
    }

    async fn update(&self, collection: Collection, key: &str, update: Update) -> StoreResult<Item> {
        let mut collections = self.collections.write().await;
        let items = collections.entry(collection).or_default();

        let mut item = items.get(key).cloned().unwrap_or_else(|| {
            let mut fresh = Item::new();
            fresh.insert(
                collection.key_attribute().to_string(),
                Value::String(key.to_string()),
            );
            fresh
        });

        for (attribute, value) in update.set {
            item.insert(attribute, value);
        }
        for (attribute, delta) in &update.increments {
            apply_increment(&mut item, attribute, *delta)?;
        }

        items.insert(key.to_string(), item.clone());
        Ok(item)
    }

    async fn delete(&self, collection: Collection, key: &str) -> StoreResult<()> {
        if let Some(items) = self.collections.write().await.get_mut(&collection) {
            items.remove(key);
        }
        Ok(())
    }

    async fn scan(
        &self,
        collection: Collection,
        filter: Option<&Filter>,
        limit: usize,
        cursor: Option<&ScanCursor>,
    ) -> StoreResult<ScanPage> {
        let collections = self.collections.read().await;
        let Some(items) = collections.get(&collection) else {
            return Ok(ScanPage::default());
        };

        let start = match cursor.and_then(|c| c.get(collection.key_attribute())) {
            Some(last) => Bound::Excluded(last.clone()),
            None => Bound::Unbounded,
        };

        let mut raw = items.range((start, Bound::Unbounded));
        let mut page = ScanPage::default();
        let mut last_key: Option<&String> = None;

        for (key, item) in raw.by_ref().take(limit.max(1)) {
            last_key = Some(key);
            if filter.map_or(true, |f| f.matches(item)) {
                page.items.push(item.clone());
            }
        }

        if raw.next().is_some() {
            if let Some(last) = last_key {
                let mut next = ScanCursor::new();
                next.insert(collection.key_attribute().to_string(), last.clone());
                page.next_cursor = Some(next);
            }
        }

        Ok(page)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
