#[cfg(feature = "dynamodb")]
use crate::store::dynamo::DynamoStore;
use crate::error::StoreResult;
#[cfg(not(feature = "dynamodb"))]
use crate::error::StoreError;
use crate::store::memory::MemoryStore;
use crate::store::KeyValueStore;
use silkstream_core::config::StoreConfig;
use silkstream_core::StoreBackend;
use std::sync::Arc;

/// Create the metadata store backend selected by configuration
pub async fn create_store(config: &StoreConfig) -> StoreResult<Arc<dyn KeyValueStore>> {
    let store: Arc<dyn KeyValueStore> = match config.backend {
        #[cfg(feature = "dynamodb")]
        StoreBackend::DynamoDb => Arc::new(DynamoStore::new(config).await?),

        #[cfg(not(feature = "dynamodb"))]
        StoreBackend::DynamoDb => {
            return Err(StoreError::Config(
                "DynamoDB store backend not available (dynamodb feature not enabled)".to_string(),
            ))
        }

        StoreBackend::Memory => {
            tracing::warn!("Using in-memory metadata store; records are lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    tracing::info!(backend = store.backend_name(), "Metadata store initialized");
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use silkstream_core::Config;

    #[tokio::test]
    async fn creates_memory_backend() {
        let config = Config::default().store;
        let store = create_store(&config).await.unwrap();
        assert_eq!(store.backend_name(), "memory");
    }
}
