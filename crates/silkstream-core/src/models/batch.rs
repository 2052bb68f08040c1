use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::video::MetadataFields;
use crate::error::AppError;

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchUpsertItem {
    pub video_id: String,
    #[serde(default)]
    pub metadata: MetadataFields,
    #[serde(default)]
    pub is_new: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchDeleteRequest {
    pub video_ids: Vec<String>,
}

/// Outcome of one batch item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchItemResult {
    pub video_id: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl BatchItemResult {
    pub fn ok(video_id: impl Into<String>) -> Self {
        Self {
            video_id: video_id.into(),
            success: true,
            error: None,
            code: None,
        }
    }

    pub fn failed(video_id: impl Into<String>, error: impl Into<String>, code: &str) -> Self {
        Self {
            video_id: video_id.into(),
            success: false,
            error: Some(error.into()),
            code: Some(code.to_string()),
        }
    }
}

/// Per-item batch report. Items run independently, so some may fail while others succeed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchResponse {
    pub results: Vec<BatchItemResult>,
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchResponse {
    pub fn from_results(results: Vec<BatchItemResult>) -> Self {
        let succeeded = results.iter().filter(|r| r.success).count();
        let failed = results.len() - succeeded;
        Self {
            results,
            succeeded,
            failed,
        }
    }

    pub fn is_partial_failure(&self) -> bool {
        self.failed > 0
    }

    /// The batch-level error to report alongside the per-item results, if any item failed.
    pub fn partial_failure(&self) -> Option<AppError> {
        self.is_partial_failure().then(|| AppError::PartialBatchFailure {
            failed: self.failed,
            total: self.results.len(),
        })
    }
}
