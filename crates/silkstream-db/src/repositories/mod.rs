mod favorites;
mod videos;

pub use favorites::FavoriteRepository;
pub use videos::{VideoPage, VideoRepository};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::error::{StoreError, StoreResult};
use crate::store::Item;

pub(crate) fn to_item<T: Serialize>(record: &T) -> StoreResult<Item> {
    match serde_json::to_value(record)? {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Serialization(format!(
            "Expected an object record, got {}",
            other
        ))),
    }
}

pub(crate) fn from_item<T: DeserializeOwned>(item: Item) -> StoreResult<T> {
    Ok(serde_json::from_value(Value::Object(item))?)
}
