use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Usage counter for one tag. `count` is adjusted by deltas and may go negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagRecord {
    pub tag: String,
    #[serde(default)]
    pub count: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TagSuggestion {
    pub tag: String,
    pub count: i64,
}

impl From<TagRecord> for TagSuggestion {
    fn from(record: TagRecord) -> Self {
        Self {
            tag: record.tag,
            count: record.count,
        }
    }
}
