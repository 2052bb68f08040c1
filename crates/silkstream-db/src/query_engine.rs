//! Filtered catalog queries over a store that only offers raw scans
//!
//! The store paginates raw rows before the filter is applied, so one page of
//! matches may span many scan pages. Two modes exist:
//!
//! * Scan order (no `sort_by`): matches are consumed page by page. The page
//!   token records the cursor the current raw page was read from and how many
//!   matches of that page were already returned, so resuming re-reads that one
//!   page and continues exactly where the previous response stopped.
//! * Sorted: the whole filtered result is pulled into memory, sorted and
//!   sliced by offset. The token carries only the offset.

use silkstream_core::models::{
    normalize_tags, sort_by_metadata, PageToken, ScanCursor, SortDirection, SortField,
    VideoMetadataRecord, VideoQuery,
};

use crate::error::StoreResult;
use crate::repositories::VideoRepository;
use crate::store::Filter;

#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    pub videos: Vec<VideoMetadataRecord>,
    /// Encoded continuation, `None` on the last page.
    pub next_page_token: Option<String>,
    /// Number of matches accumulated while answering this request.
    pub total_count_so_far: usize,
}

#[derive(Clone)]
pub struct QueryEngine {
    videos: VideoRepository,
    scan_page_size: usize,
}

impl QueryEngine {
    pub fn new(videos: VideoRepository, scan_page_size: usize) -> Self {
        Self {
            videos,
            scan_page_size,
        }
    }

    #[tracing::instrument(skip(self), fields(limit = query.limit, sort_by = ?query.sort_by))]
    pub async fn query_videos(&self, query: &VideoQuery) -> StoreResult<QueryResult> {
        let filter = build_filter(query);
        let limit = query.limit.max(1);

        let result = match query.sort_by {
            None => self.scan_ordered(filter.as_ref(), query, limit).await?,
            Some(field) => {
                self.sorted(filter.as_ref(), query, field, query.sort_direction, limit)
                    .await?
            }
        };

        tracing::debug!(
            returned = result.videos.len(),
            has_more = result.next_page_token.is_some(),
            "Video query complete"
        );

        Ok(result)
    }

    async fn scan_ordered(
        &self,
        filter: Option<&Filter>,
        query: &VideoQuery,
        limit: usize,
    ) -> StoreResult<QueryResult> {
        let mut cursor: Option<ScanCursor> = query
            .page_token
            .as_ref()
            .and_then(|t| t.last_evaluated_key.clone());
        let mut skip = query.offset();
        let mut videos = Vec::with_capacity(limit);
        let mut next: Option<PageToken> = None;

        'pages: loop {
            let page = self
                .videos
                .scan_page(filter, self.scan_page_size, cursor.as_ref())
                .await?;

            for (index, record) in page.records.into_iter().enumerate().skip(skip) {
                if videos.len() == limit {
                    next = Some(PageToken {
                        last_evaluated_key: cursor.clone(),
                        offset: index,
                    });
                    break 'pages;
                }
                videos.push(record);
            }

            skip = 0;
            match page.next_cursor {
                Some(next_cursor) => cursor = Some(next_cursor),
                None => break,
            }
        }

        let total_count_so_far = videos.len() + usize::from(next.is_some());
        Ok(QueryResult {
            videos,
            next_page_token: next.map(|t| t.encode()),
            total_count_so_far,
        })
    }

    async fn sorted(
        &self,
        filter: Option<&Filter>,
        query: &VideoQuery,
        field: SortField,
        direction: SortDirection,
        limit: usize,
    ) -> StoreResult<QueryResult> {
        let mut matches = Vec::new();
        let mut cursor: Option<ScanCursor> = None;

        loop {
            let page = self
                .videos
                .scan_page(filter, self.scan_page_size, cursor.as_ref())
                .await?;
            matches.extend(page.records);
            match page.next_cursor {
                Some(next_cursor) => cursor = Some(next_cursor),
                None => break,
            }
        }

        sort_by_metadata(&mut matches, field, direction, |record| Some(record));

        let total = matches.len();
        let offset = query.offset().min(total);
        let end = offset.saturating_add(limit).min(total);
        let videos = matches.drain(offset..end).collect();

        let next_page_token = (end < total).then(|| {
            PageToken {
                last_evaluated_key: None,
                offset: end,
            }
            .encode()
        });

        Ok(QueryResult {
            videos,
            next_page_token,
            total_count_so_far: total,
        })
    }
}

/// Search is a case-insensitive substring match on the derived search text,
/// category an exact match, and every requested tag must be present.
fn build_filter(query: &VideoQuery) -> Option<Filter> {
    let mut filters = Vec::new();

    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        filters.push(Filter::contains("searchableText", search.to_lowercase()));
    }
    if let Some(category) = query.category.as_deref().filter(|c| !c.is_empty()) {
        filters.push(Filter::equals("category", category));
    }
    for tag in normalize_tags(&query.tags) {
        filters.push(Filter::contains("tags", tag));
    }

    Filter::all(filters)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use chrono::{Duration, Utc};
    use std::collections::HashSet;
    use std::sync::Arc;

    async fn seeded(count: usize) -> VideoRepository {
        let repo = VideoRepository::new(Arc::new(MemoryStore::new()));
        let start = Utc::now();
        for i in 0..count {
            let mut record = VideoMetadataRecord::new(format!("uploads/{:03}.mp4", i));
            record.title = Some(format!("Clip {}", i));
            record.category = Some(if i % 3 == 0 { "Pets" } else { "Travel" }.to_string());
            record.tags = if i % 2 == 0 {
                vec!["cats".to_string()]
            } else {
                vec!["dogs".to_string(), "cats".to_string()]
            };
            record.upload_date = start + Duration::seconds(i as i64);
            record.refresh_searchable_text();
            repo.put(&record).await.unwrap();
        }
        repo
    }

    async fn collect_pages(engine: &QueryEngine, mut query: VideoQuery) -> Vec<String> {
        let mut ids = Vec::new();
        loop {
            let result = engine.query_videos(&query).await.unwrap();
            assert!(result.videos.len() <= query.limit);
            ids.extend(result.videos.into_iter().map(|v| v.id));
            match result.next_page_token {
                Some(token) => query.page_token = Some(PageToken::decode(&token).unwrap()),
                None => return ids,
            }
        }
    }

    #[tokio::test]
    async fn following_tokens_yields_every_match_once() {
        let repo = seeded(23).await;
        let engine = QueryEngine::new(repo, 4);
        let query = VideoQuery {
            category: Some("Travel".to_string()),
            limit: 3,
            ..Default::default()
        };

        let paged = collect_pages(&engine, query.clone()).await;
        let unbounded = engine
            .query_videos(&VideoQuery {
                limit: 1000,
                ..query
            })
            .await
            .unwrap();

        let unique: HashSet<_> = paged.iter().cloned().collect();
        assert_eq!(unique.len(), paged.len());
        let expected: Vec<_> = unbounded.videos.into_iter().map(|v| v.id).collect();
        assert_eq!(paged, expected);
        assert_eq!(paged.len(), 15);
    }

    #[tokio::test]
    async fn sorted_pages_are_complete_and_ordered() {
        let repo = seeded(10).await;
        let engine = QueryEngine::new(repo, 3);
        let query = VideoQuery {
            tags: vec!["dogs".to_string()],
            sort_by: Some(SortField::UploadDate),
            sort_direction: SortDirection::Desc,
            limit: 2,
            ..Default::default()
        };

        let ids = collect_pages(&engine, query).await;
        assert_eq!(
            ids,
            vec![
                "uploads/009.mp4",
                "uploads/007.mp4",
                "uploads/005.mp4",
                "uploads/003.mp4",
                "uploads/001.mp4"
            ]
        );
    }

    #[tokio::test]
    async fn tags_combine_with_and_semantics() {
        let repo = seeded(6).await;
        let engine = QueryEngine::new(repo, 2);
        let result = engine
            .query_videos(&VideoQuery {
                tags: vec!["Cats".to_string(), "dogs".to_string()],
                limit: 10,
                ..Default::default()
            })
            .await
            .unwrap();

        let ids: Vec<_> = result.videos.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, vec!["uploads/001.mp4", "uploads/003.mp4", "uploads/005.mp4"]);
        assert!(result.next_page_token.is_none());
    }

    #[tokio::test]
    async fn search_is_case_insensitive_substring() {
        let repo = seeded(12).await;
        let engine = QueryEngine::new(repo, 5);
        let result = engine
            .query_videos(&VideoQuery {
                search: Some("  CLIP 1".to_string()),
                limit: 10,
                ..Default::default()
            })
            .await
            .unwrap();

        let ids: Vec<_> = result.videos.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, vec!["uploads/001.mp4", "uploads/010.mp4", "uploads/011.mp4"]);
    }

    #[tokio::test]
    async fn last_page_has_no_token() {
        let repo = seeded(4).await;
        let engine = QueryEngine::new(repo, 10);
        let result = engine
            .query_videos(&VideoQuery {
                limit: 4,
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(result.videos.len(), 4);
        assert!(result.next_page_token.is_none());
        assert_eq!(result.total_count_so_far, 4);
    }

    #[tokio::test]
    async fn sorted_offset_past_the_end_is_empty() {
        let repo = seeded(3).await;
        let engine = QueryEngine::new(repo, 10);
        let result = engine
            .query_videos(&VideoQuery {
                sort_by: Some(SortField::Title),
                page_token: Some(PageToken {
                    last_evaluated_key: None,
                    offset: 50,
                }),
                limit: 5,
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(result.videos.is_empty());
        assert!(result.next_page_token.is_none());
        assert_eq!(result.total_count_so_far, 3);
    }
}
