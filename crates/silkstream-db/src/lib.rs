//! Silkstream metadata store
//!
//! The key-value store adapter (DynamoDB or in-memory), typed repositories
//! over it, the tag ledger and the filtered query engine.

pub mod error;
pub mod factory;
pub mod query_engine;
pub mod repositories;
pub mod store;
pub mod tag_ledger;

pub use error::{StoreError, StoreResult};
pub use factory::create_store;
pub use query_engine::{QueryEngine, QueryResult};
pub use repositories::{FavoriteRepository, VideoPage, VideoRepository};
#[cfg(feature = "dynamodb")]
pub use store::dynamo::DynamoStore;
pub use store::memory::MemoryStore;
pub use store::{scan_all, Collection, Filter, Item, KeyValueStore, ScanPage, Update};
pub use tag_ledger::TagLedger;
