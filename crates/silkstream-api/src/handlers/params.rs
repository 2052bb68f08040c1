//! Listing query-string parameters shared by `/videos` and `/videos-archive`.

use serde::Deserialize;
use silkstream_core::models::{normalize_tags, PageToken, SortDirection, SortField, VideoQuery};
use silkstream_core::{AppError, ListingConfig};
use utoipa::IntoParams;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListParams {
    /// Case-insensitive substring match on title, description, category and tags
    pub search: Option<String>,
    /// Exact category match
    pub category: Option<String>,
    /// Comma-separated tags; every one must be present
    pub tags: Option<String>,
    /// uploadDate, title, category, createdDate or duration
    pub sort_by: Option<String>,
    /// asc or desc (default desc)
    pub sort_direction: Option<String>,
    /// Continuation token from a previous response
    pub page_token: Option<String>,
    pub limit: Option<usize>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl ListParams {
    /// Validate and convert into a catalog query. Blank values count as absent.
    pub fn into_query(self, listing: &ListingConfig) -> Result<VideoQuery, AppError> {
        let limit = match self.limit {
            None => listing.default_page_limit,
            Some(0) => {
                return Err(AppError::InvalidInput(
                    "limit must be greater than zero".to_string(),
                ))
            }
            Some(limit) => limit.min(listing.max_page_limit),
        };

        let sort_by = non_empty(self.sort_by)
            .map(|s| s.parse::<SortField>())
            .transpose()?;
        let sort_direction = non_empty(self.sort_direction)
            .map(|s| s.parse::<SortDirection>())
            .transpose()?
            .unwrap_or_default();
        let page_token = non_empty(self.page_token)
            .map(|t| PageToken::decode(&t))
            .transpose()?;
        let tags = self
            .tags
            .map(|t| normalize_tags(t.split(',')))
            .unwrap_or_default();

        Ok(VideoQuery {
            search: non_empty(self.search),
            category: non_empty(self.category),
            tags,
            sort_by,
            sort_direction,
            page_token,
            limit,
        })
    }
}
