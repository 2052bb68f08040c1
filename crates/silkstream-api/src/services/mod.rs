pub mod catalog;
pub mod metadata;
pub mod search_index;
pub mod video_lifecycle;

pub use catalog::CatalogService;
pub use metadata::MetadataService;
pub use search_index::{create_search_index, reindex_all, NoopSearchIndex, ReindexSummary, SearchIndex};
pub use video_lifecycle::VideoLifecycleService;
