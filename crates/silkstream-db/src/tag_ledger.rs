//! Tag usage counters
//!
//! Each distinct tag has a record holding how many videos currently carry it.
//! Counters move by ±1 deltas computed from a video's old and new tag sets;
//! they are never recomputed from a full scan, so concurrent writers racing on
//! the same tag can make a counter drift.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use serde_json::Value;
use silkstream_core::models::{ScanCursor, TagRecord, TagSuggestion};

use crate::error::StoreResult;
use crate::repositories::from_item;
use crate::store::{scan_all, Collection, Filter, KeyValueStore, Update};

#[derive(Clone)]
pub struct TagLedger {
    store: Arc<dyn KeyValueStore>,
    scan_page_size: usize,
    suggestion_limit: usize,
}

impl TagLedger {
    pub fn new(store: Arc<dyn KeyValueStore>, scan_page_size: usize, suggestion_limit: usize) -> Self {
        Self {
            store,
            scan_page_size,
            suggestion_limit,
        }
    }

    /// Decrement every tag only in `old_tags`, increment every tag only in `new_tags`.
    ///
    /// Tags in both sets are untouched. Counters are not clamped, so removing a
    /// tag that has no record creates it with a count of -1. All per-tag
    /// updates are issued concurrently; the first failure is returned after
    /// every update has completed.
    #[tracing::instrument(skip(self))]
    pub async fn apply_tag_delta(&self, old_tags: &[String], new_tags: &[String]) -> StoreResult<()> {
        let old: HashSet<&str> = old_tags.iter().map(String::as_str).collect();
        let new: HashSet<&str> = new_tags.iter().map(String::as_str).collect();

        let removed = old.difference(&new).map(|tag| (*tag, -1));
        let added = new.difference(&old).map(|tag| (*tag, 1));
        let deltas: Vec<(&str, i64)> = removed.chain(added).collect();

        if deltas.is_empty() {
            return Ok(());
        }

        let now = Utc::now().to_rfc3339();
        let updates = deltas.iter().map(|(tag, delta)| {
            let update = Update::default()
                .increment("count", *delta)
                .set("lastUsed", now.clone());
            async move {
                let result = self.store.update(Collection::Tags, tag, update).await;
                if let Err(ref e) = result {
                    tracing::error!(error = %e, tag = %tag, delta = *delta, "Tag counter update failed");
                }
                result
            }
        });

        let results = join_all(updates).await;

        tracing::debug!(changed = deltas.len(), "Applied tag delta");

        for result in results {
            result?;
        }
        Ok(())
    }

    /// Tags containing `prefix` anywhere, case-insensitively, in scan order.
    #[tracing::instrument(skip(self))]
    pub async fn suggest_tags(&self, prefix: &str) -> StoreResult<Vec<TagSuggestion>> {
        let filter = Filter::contains("tag", prefix.trim().to_lowercase());
        let mut suggestions = Vec::new();
        let mut cursor: Option<ScanCursor> = None;

        loop {
            let page = self
                .store
                .scan(Collection::Tags, Some(&filter), self.scan_page_size, cursor.as_ref())
                .await?;

            for item in page.items {
                match from_item::<TagRecord>(item) {
                    Ok(record) => suggestions.push(TagSuggestion::from(record)),
                    Err(e) => tracing::warn!(error = %e, "Skipping malformed tag record"),
                }
                if suggestions.len() >= self.suggestion_limit {
                    return Ok(suggestions);
                }
            }

            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => return Ok(suggestions),
            }
        }
    }

    /// Every tag record, ordered by tag.
    #[tracing::instrument(skip(self))]
    pub async fn list_all_tags(&self) -> StoreResult<Vec<TagRecord>> {
        let items = scan_all(self.store.as_ref(), Collection::Tags, None, self.scan_page_size).await?;

        let mut records: Vec<TagRecord> = items
            .into_iter()
            .filter_map(|item| from_item::<TagRecord>(item).ok())
            .collect();
        records.sort_by(|a, b| a.tag.cmp(&b.tag));
        Ok(records)
    }

    /// Distinct lowercased categories across every video, sorted.
    #[tracing::instrument(skip(self))]
    pub async fn list_all_categories(&self) -> StoreResult<Vec<String>> {
        let items = scan_all(self.store.as_ref(), Collection::Videos, None, self.scan_page_size).await?;

        let categories: BTreeSet<String> = items
            .iter()
            .filter_map(|item| item.get("category").and_then(Value::as_str))
            .map(|category| category.trim().to_lowercase())
            .filter(|category| !category.is_empty())
            .collect();

        Ok(categories.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use serde_json::json;
    use std::collections::HashMap;

    fn tags(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    async fn counts(ledger: &TagLedger) -> HashMap<String, i64> {
        ledger
            .list_all_tags()
            .await
            .unwrap()
            .into_iter()
            .map(|r| (r.tag, r.count))
            .collect()
    }

    fn ledger(store: Arc<MemoryStore>) -> TagLedger {
        TagLedger::new(store, 2, 3)
    }

    #[tokio::test]
    async fn delta_only_touches_changed_tags() {
        let ledger = ledger(Arc::new(MemoryStore::new()));
        ledger
            .apply_tag_delta(&[], &tags(&["cats", "beach", "sun"]))
            .await
            .unwrap();
        let before = counts(&ledger).await;

        ledger
            .apply_tag_delta(&tags(&["cats", "beach"]), &tags(&["cats", "dogs"]))
            .await
            .unwrap();
        let after = counts(&ledger).await;

        assert_eq!(after["cats"], before["cats"]);
        assert_eq!(after["beach"], before["beach"] - 1);
        assert_eq!(after["dogs"], 1);
        assert_eq!(after["sun"], before["sun"]);
    }

    #[tokio::test]
    async fn adding_a_tag_to_an_existing_set() {
        let ledger = ledger(Arc::new(MemoryStore::new()));
        ledger.apply_tag_delta(&[], &tags(&["cats"])).await.unwrap();
        ledger
            .apply_tag_delta(&tags(&["cats"]), &tags(&["cats", "dogs"]))
            .await
            .unwrap();

        let counts = counts(&ledger).await;
        assert_eq!(counts["cats"], 1);
        assert_eq!(counts["dogs"], 1);
    }

    #[tokio::test]
    async fn removing_an_unknown_tag_goes_negative() {
        let ledger = ledger(Arc::new(MemoryStore::new()));
        ledger.apply_tag_delta(&tags(&["ghost"]), &[]).await.unwrap();

        let records = ledger.list_all_tags().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].count, -1);
        assert!(records[0].last_used.is_some());
    }

    #[tokio::test]
    async fn suggestions_match_substrings_case_insensitively_up_to_limit() {
        let ledger = ledger(Arc::new(MemoryStore::new()));
        ledger
            .apply_tag_delta(&[], &tags(&["bobcat", "cats", "dogs", "scatter", "tomcat"]))
            .await
            .unwrap();

        let found: Vec<_> = ledger
            .suggest_tags("CAT")
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.tag)
            .collect();
        assert_eq!(found, vec!["bobcat", "cats", "scatter"]);

        assert!(ledger.suggest_tags("zebra").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn categories_are_lowercased_and_deduplicated() {
        let store = Arc::new(MemoryStore::new());
        for (id, category) in [("a", "Travel"), ("b", "travel"), ("c", "Pets")] {
            let item = json!({"id": id, "category": category}).as_object().cloned().unwrap();
            store.put(Collection::Videos, item).await.unwrap();
        }
        let uncategorized = json!({"id": "d"}).as_object().cloned().unwrap();
        store.put(Collection::Videos, uncategorized).await.unwrap();

        let categories = ledger(store).list_all_categories().await.unwrap();
        assert_eq!(categories, vec!["pets", "travel"]);
    }
}
