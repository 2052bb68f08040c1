use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::video::VideoMetadataRecord;
use crate::error::AppError;

/// Primary-key attributes of the last item a store scan returned.
pub type ScanCursor = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    UploadDate,
    Title,
    Category,
    CreatedDate,
    Duration,
}

impl FromStr for SortField {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "uploadDate" => Ok(SortField::UploadDate),
            "title" => Ok(SortField::Title),
            "category" => Ok(SortField::Category),
            "createdDate" => Ok(SortField::CreatedDate),
            "duration" => Ok(SortField::Duration),
            other => Err(AppError::InvalidInput(format!(
                "Unsupported sortBy '{}'. Expected one of uploadDate, title, category, createdDate, duration",
                other
            ))),
        }
    }
}

impl Display for SortField {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let name = match self {
            SortField::UploadDate => "uploadDate",
            SortField::Title => "title",
            SortField::Category => "category",
            SortField::CreatedDate => "createdDate",
            SortField::Duration => "duration",
        };
        write!(f, "{}", name)
    }
}

impl SortField {
    /// Ascending comparison. A record lacking the field (or a missing record) sorts first.
    pub fn compare(
        self,
        a: Option<&VideoMetadataRecord>,
        b: Option<&VideoMetadataRecord>,
    ) -> Ordering {
        match self {
            SortField::Title => compare_text(
                a.and_then(|r| r.title.as_deref()),
                b.and_then(|r| r.title.as_deref()),
            ),
            SortField::Category => compare_text(
                a.and_then(|r| r.category.as_deref()),
                b.and_then(|r| r.category.as_deref()),
            ),
            SortField::UploadDate => a.map(|r| r.upload_date).cmp(&b.map(|r| r.upload_date)),
            SortField::CreatedDate => a
                .and_then(|r| r.created_date)
                .cmp(&b.and_then(|r| r.created_date)),
            SortField::Duration => {
                match (a.and_then(|r| r.duration), b.and_then(|r| r.duration)) {
                    (Some(x), Some(y)) => x.total_cmp(&y),
                    (None, Some(_)) => Ordering::Less,
                    (Some(_), None) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                }
            }
        }
    }
}

fn compare_text(a: Option<&str>, b: Option<&str>) -> Ordering {
    a.map(str::to_lowercase).cmp(&b.map(str::to_lowercase))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl FromStr for SortDirection {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(AppError::InvalidInput(format!(
                "Unsupported sortDirection '{}'. Expected asc or desc",
                other
            ))),
        }
    }
}

impl SortDirection {
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

/// Sort `items` in place by the metadata each one resolves to.
pub fn sort_by_metadata<T, F>(items: &mut [T], field: SortField, direction: SortDirection, metadata: F)
where
    F: Fn(&T) -> Option<&VideoMetadataRecord>,
{
    items.sort_by(|a, b| direction.apply(field.compare(metadata(a), metadata(b))));
}

/// Validated catalog query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VideoQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub tags: Vec<String>,
    /// `None` keeps scan order.
    pub sort_by: Option<SortField>,
    pub sort_direction: SortDirection,
    pub page_token: Option<PageToken>,
    pub limit: usize,
}

impl VideoQuery {
    pub fn has_filters(&self) -> bool {
        self.search.is_some() || self.category.is_some() || !self.tags.is_empty()
    }

    pub fn offset(&self) -> usize {
        self.page_token.as_ref().map(|t| t.offset).unwrap_or(0)
    }
}

/// Opaque continuation handed to clients as base64-encoded JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageToken {
    #[serde(default)]
    pub last_evaluated_key: Option<ScanCursor>,
    pub offset: usize,
}

impl PageToken {
    pub fn encode(&self) -> String {
        // Serializing a map of strings and an integer cannot fail.
        let json = serde_json::to_vec(self).unwrap_or_default();
        STANDARD.encode(json)
    }

    pub fn decode(token: &str) -> Result<Self, AppError> {
        let bytes = STANDARD
            .decode(token.trim())
            .map_err(|e| AppError::InvalidInput(format!("Malformed page token: {}", e)))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| AppError::InvalidInput(format!("Malformed page token: {}", e)))
    }
}
