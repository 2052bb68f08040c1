//! DynamoDB-backed store.
//!
//! ## Tables
//! ```text
//! silkstream-vids       pk: id (S)
//! silkstream-tags       pk: tag (S)
//! silkstream-favorites  pk: videoId (S)
//! ```
//! Items map JSON values onto attribute values: strings to `S`, numbers to
//! `N`, booleans to `BOOL`, arrays to `L`, objects to `M`.

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::types::{AttributeValue, ReturnValue};
use aws_sdk_dynamodb::Client as DynamoDbClient;
use serde_json::{Number, Value};
use silkstream_core::config::StoreConfig;
use silkstream_core::models::ScanCursor;
use tracing::{debug, error, instrument};

use super::{Collection, Filter, Item, KeyValueStore, ScanPage, Update};
use crate::error::{StoreError, StoreResult};

type AttributeMap = HashMap<String, AttributeValue>;

#[derive(Debug, Clone)]
struct TableNames {
    videos: String,
    tags: String,
    favorites: String,
}

#[derive(Clone)]
pub struct DynamoStore {
    client: DynamoDbClient,
    tables: TableNames,
}

impl DynamoStore {
    /// Build a client for the configured region, with an optional endpoint for DynamoDB Local.
    #[instrument(skip(config), fields(region = %config.region))]
    pub async fn new(config: &StoreConfig) -> StoreResult<Self> {
        let mut config_builder = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(config.region.clone()));

        if let Some(endpoint) = &config.endpoint {
            config_builder = config_builder.endpoint_url(endpoint.clone());
        }

        let sdk_config = config_builder.load().await;
        let client = DynamoDbClient::new(&sdk_config);

        debug!(
            videos_table = %config.videos_table,
            tags_table = %config.tags_table,
            favorites_table = %config.favorites_table,
            "DynamoDB store initialized"
        );

        Ok(Self {
            client,
            tables: TableNames {
                videos: config.videos_table.clone(),
                tags: config.tags_table.clone(),
                favorites: config.favorites_table.clone(),
            },
        })
    }

    fn table(&self, collection: Collection) -> &str {
        match collection {
            Collection::Videos => &self.tables.videos,
            Collection::Tags => &self.tables.tags,
            Collection::Favorites => &self.tables.favorites,
        }
    }
}

/// Convert a JSON value to a DynamoDB attribute value.
pub fn json_to_attribute(value: &Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null(true),
        Value::Bool(b) => AttributeValue::Bool(*b),
        Value::Number(n) => AttributeValue::N(n.to_string()),
        Value::String(s) => AttributeValue::S(s.clone()),
        Value::Array(values) => AttributeValue::L(values.iter().map(json_to_attribute).collect()),
        Value::Object(map) => AttributeValue::M(
            map.iter()
                .map(|(k, v)| (k.clone(), json_to_attribute(v)))
                .collect(),
        ),
    }
}

/// Convert a DynamoDB attribute value back to JSON.
pub fn attribute_to_json(value: &AttributeValue) -> StoreResult<Value> {
    Ok(match value {
        AttributeValue::Null(_) => Value::Null,
        AttributeValue::Bool(b) => Value::Bool(*b),
        AttributeValue::S(s) => Value::String(s.clone()),
        AttributeValue::N(n) => parse_number(n)?,
        AttributeValue::L(values) => Value::Array(
            values
                .iter()
                .map(attribute_to_json)
                .collect::<StoreResult<Vec<_>>>()?,
        ),
        AttributeValue::Ss(values) => {
            Value::Array(values.iter().cloned().map(Value::String).collect())
        }
        AttributeValue::Ns(values) => Value::Array(
            values
                .iter()
                .map(|n| parse_number(n))
                .collect::<StoreResult<Vec<_>>>()?,
        ),
        AttributeValue::M(map) => Value::Object(attributes_to_item(map)?),
        other => {
            return Err(StoreError::Serialization(format!(
                "Unsupported attribute type: {:?}",
                other
            )))
        }
    })
}

fn parse_number(raw: &str) -> StoreResult<Value> {
    if let Ok(i) = raw.parse::<i64>() {
        return Ok(Value::from(i));
    }
    raw.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| StoreError::Serialization(format!("Invalid number attribute: {}", raw)))
}

pub fn item_to_attributes(item: &Item) -> AttributeMap {
    item.iter()
        .map(|(k, v)| (k.clone(), json_to_attribute(v)))
        .collect()
}

pub fn attributes_to_item(attributes: &AttributeMap) -> StoreResult<Item> {
    attributes
        .iter()
        .map(|(k, v)| Ok((k.clone(), attribute_to_json(v)?)))
        .collect()
}

fn cursor_to_attributes(cursor: &ScanCursor) -> AttributeMap {
    cursor
        .iter()
        .map(|(k, v)| (k.clone(), AttributeValue::S(v.clone())))
        .collect()
}

fn attributes_to_cursor(attributes: &AttributeMap) -> ScanCursor {
    attributes
        .iter()
        .filter_map(|(k, v)| v.as_s().ok().map(|s| (k.clone(), s.clone())))
        .collect()
}

/// Expression text plus its placeholder bindings.
#[derive(Debug, Default)]
struct Expression {
    names: HashMap<String, String>,
    values: AttributeMap,
}

impl Expression {
    fn name(&mut self, attribute: &str) -> String {
        let placeholder = format!("#n{}", self.names.len());
        self.names.insert(placeholder.clone(), attribute.to_string());
        placeholder
    }

    fn value(&mut self, value: AttributeValue) -> String {
        let placeholder = format!(":v{}", self.values.len());
        self.values.insert(placeholder.clone(), value);
        placeholder
    }

    fn filter(&mut self, filter: &Filter) -> String {
        match filter {
            Filter::Contains { attribute, value } => {
                let name = self.name(attribute);
                let value = self.value(AttributeValue::S(value.clone()));
                format!("contains({}, {})", name, value)
            }
            Filter::Equals { attribute, value } => {
                let name = self.name(attribute);
                let value = self.value(AttributeValue::S(value.clone()));
                format!("{} = {}", name, value)
            }
            Filter::All(filters) => filters
                .iter()
                .map(|f| format!("({})", self.filter(f)))
                .collect::<Vec<_>>()
                .join(" AND "),
        }
    }

    fn update(&mut self, update: &Update) -> String {
        let mut clauses = Vec::new();
        for (attribute, value) in &update.set {
            let name = self.name(attribute);
            let value = self.value(json_to_attribute(value));
            clauses.push(format!("{} = {}", name, value));
        }
        if !update.increments.is_empty() {
            let zero = self.value(AttributeValue::N("0".to_string()));
            for (attribute, delta) in &update.increments {
                let name = self.name(attribute);
                let delta = self.value(AttributeValue::N(delta.to_string()));
                clauses.push(format!(
                    "{} = if_not_exists({}, {}) + {}",
                    name, name, zero, delta
                ));
            }
        }
        format!("SET {}", clauses.join(", "))
    }

    fn names(&self) -> Option<HashMap<String, String>> {
        (!self.names.is_empty()).then(|| self.names.clone())
    }

    fn values(&self) -> Option<AttributeMap> {
        (!self.values.is_empty()).then(|| self.values.clone())
    }
}

#[async_trait]
impl KeyValueStore for DynamoStore {
    #[instrument(skip(self, item), fields(collection = collection.as_str()))]
    async fn put(&self, collection: Collection, item: Item) -> StoreResult<()> {
        if !item.contains_key(collection.key_attribute()) {
            return Err(StoreError::MissingKey(collection.key_attribute().to_string()));
        }

        self.client
            .put_item()
            .table_name(self.table(collection))
            .set_item(Some(item_to_attributes(&item)))
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "DynamoDB put_item failed");
                StoreError::Backend(format!("DynamoDB put_item failed: {}", e))
            })?;

        Ok(())
    }

    #[instrument(skip(self), fields(collection = collection.as_str()))]
    async fn get(&self, collection: Collection, key: &str) -> StoreResult<Option<Item>> {
        let result = self
            .client
            .get_item()
            .table_name(self.table(collection))
            .key(collection.key_attribute(), AttributeValue::S(key.to_string()))
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "DynamoDB get_item failed");
                StoreError::Backend(format!("DynamoDB get_item failed: {}", e))
            })?;

        result.item().map(attributes_to_item).transpose()
    }

    #[instrument(skip(self, update), fields(collection = collection.as_str()))]
    async fn update(&self, collection: Collection, key: &str, update: Update) -> StoreResult<Item> {
        if update.is_empty() {
            return self.get(collection, key).await?.ok_or_else(|| {
                StoreError::Backend(format!("Record {} not found for empty update", key))
            });
        }

        let mut expression = Expression::default();
        let update_expression = expression.update(&update);

        let result = self
            .client
            .update_item()
            .table_name(self.table(collection))
            .key(collection.key_attribute(), AttributeValue::S(key.to_string()))
            .update_expression(update_expression)
            .set_expression_attribute_names(expression.names())
            .set_expression_attribute_values(expression.values())
            .return_values(ReturnValue::AllNew)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "DynamoDB update_item failed");
                StoreError::Backend(format!("DynamoDB update_item failed: {}", e))
            })?;

        match result.attributes() {
            Some(attributes) => attributes_to_item(attributes),
            None => Err(StoreError::Backend(
                "DynamoDB update_item returned no attributes".to_string(),
            )),
        }
    }

    #[instrument(skip(self), fields(collection = collection.as_str()))]
    async fn delete(&self, collection: Collection, key: &str) -> StoreResult<()> {
        self.client
            .delete_item()
            .table_name(self.table(collection))
            .key(collection.key_attribute(), AttributeValue::S(key.to_string()))
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "DynamoDB delete_item failed");
                StoreError::Backend(format!("DynamoDB delete_item failed: {}", e))
            })?;

        Ok(())
    }

    #[instrument(skip(self, filter, cursor), fields(collection = collection.as_str(), limit))]
    async fn scan(
        &self,
        collection: Collection,
        filter: Option<&Filter>,
        limit: usize,
        cursor: Option<&ScanCursor>,
    ) -> StoreResult<ScanPage> {
        let start_time = std::time::Instant::now();
        let mut expression = Expression::default();
        let filter_expression = filter.map(|f| expression.filter(f));

        let result = self
            .client
            .scan()
            .table_name(self.table(collection))
            .set_filter_expression(filter_expression)
            .set_expression_attribute_names(expression.names())
            .set_expression_attribute_values(expression.values())
            .limit(i32::try_from(limit.max(1)).unwrap_or(i32::MAX))
            .set_exclusive_start_key(cursor.map(cursor_to_attributes))
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "DynamoDB scan failed");
                StoreError::Backend(format!("DynamoDB scan failed: {}", e))
            })?;

        let items = result
            .items()
            .iter()
            .map(attributes_to_item)
            .collect::<StoreResult<Vec<_>>>()?;

        let next_cursor = result.last_evaluated_key().map(attributes_to_cursor);

        debug!(
            matched = items.len(),
            scanned = result.scanned_count(),
            has_more = next_cursor.is_some(),
            duration_ms = start_time.elapsed().as_millis(),
            "DynamoDB scan page"
        );

        Ok(ScanPage { items, next_cursor })
    }

    fn backend_name(&self) -> &'static str {
        "dynamodb"
    }
}
