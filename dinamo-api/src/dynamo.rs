/// DynamoDB-backed store
///
/// Forwards compiled expressions to the AWS SDK unchanged. SDK failures are
/// passed through as `Error::Store`, except a failed update condition, which
/// is reported as `Error::ConditionalCheckFailed`.

use crate::store::{QueryRequest, ScanRequest, Store, UpdateRequest};
use async_trait::async_trait;
use aws_config::{timeout::TimeoutConfig, BehaviorVersion, Region};
use aws_sdk_dynamodb::error::SdkError;
use aws_sdk_dynamodb::operation::update_item::UpdateItemError;
use aws_sdk_dynamodb::primitives::Blob;
use aws_sdk_dynamodb::types::{AttributeValue, KeysAndAttributes};
use aws_sdk_dynamodb::Client;
use bytes::Bytes;
use dinamo_core::{Cursor, DynamoConfig, Error, Expressions, Item, Page, Result, Value};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Keys per BatchGetItem request
const BATCH_GET_SIZE: usize = 100;

type AttributeMap = HashMap<String, AttributeValue>;

/// Convert a value into its wire representation
pub fn to_attribute(value: &Value) -> AttributeValue {
    match value {
        Value::N(n) => AttributeValue::N(n.clone()),
        Value::S(s) => AttributeValue::S(s.clone()),
        Value::B(b) => AttributeValue::B(Blob::new(b.to_vec())),
        Value::Bool(b) => AttributeValue::Bool(*b),
        Value::Null => AttributeValue::Null(true),
        Value::L(list) => AttributeValue::L(list.iter().map(to_attribute).collect()),
        Value::M(map) => AttributeValue::M(to_attribute_map(map)),
    }
}

/// Convert a wire value back. Sets become lists.
pub fn from_attribute(attribute: AttributeValue) -> Value {
    match attribute {
        AttributeValue::N(n) => Value::N(n),
        AttributeValue::S(s) => Value::S(s),
        AttributeValue::B(blob) => Value::B(Bytes::from(blob.into_inner())),
        AttributeValue::Bool(b) => Value::Bool(b),
        AttributeValue::Null(_) => Value::Null,
        AttributeValue::L(list) => Value::L(list.into_iter().map(from_attribute).collect()),
        AttributeValue::M(map) => Value::M(from_attribute_map(map)),
        AttributeValue::Ss(strings) => Value::L(strings.into_iter().map(Value::S).collect()),
        AttributeValue::Ns(numbers) => Value::L(numbers.into_iter().map(Value::N).collect()),
        AttributeValue::Bs(blobs) => Value::L(
            blobs
                .into_iter()
                .map(|blob| Value::B(Bytes::from(blob.into_inner())))
                .collect(),
        ),
        _ => Value::Null,
    }
}

fn to_attribute_map(item: &Item) -> AttributeMap {
    item.iter().map(|(k, v)| (k.clone(), to_attribute(v))).collect()
}

fn from_attribute_map(map: AttributeMap) -> Item {
    map.into_iter().map(|(k, v)| (k, from_attribute(v))).collect()
}

fn names(expressions: &Expressions) -> Option<HashMap<String, String>> {
    expressions
        .names
        .as_ref()
        .map(|names| names.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
}

fn values(expressions: &Expressions) -> Option<AttributeMap> {
    expressions
        .values
        .as_ref()
        .map(|values| values.iter().map(|(k, v)| (k.clone(), to_attribute(v))).collect())
}

fn limit(limit: Option<usize>) -> Option<i32> {
    limit.map(|l| i32::try_from(l).unwrap_or(i32::MAX))
}

fn page(items: Option<Vec<AttributeMap>>, last_evaluated_key: Option<AttributeMap>) -> Page<Item> {
    Page::new(
        items
            .unwrap_or_default()
            .into_iter()
            .map(from_attribute_map)
            .collect(),
        last_evaluated_key.map(|key| Cursor::new(from_attribute_map(key))),
    )
}

fn is_conditional_check_failed<R>(err: &SdkError<UpdateItemError, R>) -> bool {
    match err {
        SdkError::ServiceError(service_err) => {
            matches!(service_err.err(), UpdateItemError::ConditionalCheckFailedException(_))
        }
        _ => false,
    }
}

/// Store backed by a DynamoDB table
#[derive(Debug, Clone)]
pub struct DynamoStore {
    client: Client,
}

impl DynamoStore {
    /// Build a client from the SDK's default provider chain plus `config`
    pub async fn connect(config: &DynamoConfig) -> Result<Self> {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest()).load().await;
        let mut builder = aws_sdk_dynamodb::config::Builder::from(&sdk_config);

        if let Some(region) = &config.region {
            builder = builder.region(Region::new(region.clone()));
        }

        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        if let Some(timeout_ms) = config.timeout_ms {
            let timeout_config = TimeoutConfig::builder()
                .operation_timeout(Duration::from_millis(timeout_ms))
                .build();
            builder = builder.timeout_config(timeout_config);
        }

        debug!(region = ?config.region, endpoint = ?config.endpoint, "connecting to DynamoDB");
        Ok(Self::from_client(Client::from_conf(builder.build())))
    }

    /// Wrap a pre-built client
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl Store for DynamoStore {
    async fn put(&self, table: &str, item: Item) -> Result<()> {
        self.client
            .put_item()
            .table_name(table)
            .set_item(Some(to_attribute_map(&item)))
            .send()
            .await
            .map_err(|e| Error::store(aws_sdk_dynamodb::Error::from(e)))?;
        Ok(())
    }

    async fn get(&self, table: &str, key: Item) -> Result<Option<Item>> {
        let output = self
            .client
            .get_item()
            .table_name(table)
            .set_key(Some(to_attribute_map(&key)))
            .send()
            .await
            .map_err(|e| Error::store(aws_sdk_dynamodb::Error::from(e)))?;
        Ok(output.item.map(from_attribute_map))
    }

    async fn update(&self, request: UpdateRequest) -> Result<()> {
        let expressions = &request.expressions;
        let result = self
            .client
            .update_item()
            .table_name(&request.table)
            .set_key(Some(to_attribute_map(&request.key)))
            .set_update_expression(expressions.update.clone())
            .set_condition_expression(expressions.condition.clone())
            .set_expression_attribute_names(names(expressions))
            .set_expression_attribute_values(values(expressions))
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) if is_conditional_check_failed(&err) => Err(Error::ConditionalCheckFailed(
                expressions.condition.clone().unwrap_or_default(),
            )),
            Err(err) => Err(Error::store(aws_sdk_dynamodb::Error::from(err))),
        }
    }

    async fn delete(&self, table: &str, key: Item) -> Result<()> {
        self.client
            .delete_item()
            .table_name(table)
            .set_key(Some(to_attribute_map(&key)))
            .send()
            .await
            .map_err(|e| Error::store(aws_sdk_dynamodb::Error::from(e)))?;
        Ok(())
    }

    async fn query(&self, request: QueryRequest) -> Result<Page<Item>> {
        let expressions = &request.expressions;
        let output = self
            .client
            .query()
            .table_name(&request.table)
            .set_index_name(request.index_name.clone())
            .set_key_condition_expression(expressions.key_condition.clone())
            .set_filter_expression(expressions.filter.clone())
            .set_expression_attribute_names(names(expressions))
            .set_expression_attribute_values(values(expressions))
            .set_limit(limit(request.limit))
            .scan_index_forward(request.scan_index_forward)
            .set_exclusive_start_key(
                request
                    .exclusive_start_key
                    .map(|cursor| to_attribute_map(cursor.key())),
            )
            .send()
            .await
            .map_err(|e| Error::store(aws_sdk_dynamodb::Error::from(e)))?;

        Ok(page(output.items, output.last_evaluated_key))
    }

    async fn scan(&self, request: ScanRequest) -> Result<Page<Item>> {
        let expressions = &request.expressions;
        let output = self
            .client
            .scan()
            .table_name(&request.table)
            .set_index_name(request.index_name.clone())
            .set_filter_expression(expressions.filter.clone())
            .set_expression_attribute_names(names(expressions))
            .set_expression_attribute_values(values(expressions))
            .set_limit(limit(request.limit))
            .set_exclusive_start_key(
                request
                    .exclusive_start_key
                    .map(|cursor| to_attribute_map(cursor.key())),
            )
            .send()
            .await
            .map_err(|e| Error::store(aws_sdk_dynamodb::Error::from(e)))?;

        Ok(page(output.items, output.last_evaluated_key))
    }

    // Unprocessed keys are logged and dropped, not resubmitted
    async fn batch_get(&self, table: &str, keys: Vec<Item>) -> Result<Option<Vec<Item>>> {
        let mut found: Option<Vec<Item>> = None;

        for chunk in keys.chunks(BATCH_GET_SIZE) {
            let keys_and_attributes = KeysAndAttributes::builder()
                .set_keys(Some(chunk.iter().map(to_attribute_map).collect()))
                .build()
                .map_err(Error::store)?;

            let output = self
                .client
                .batch_get_item()
                .request_items(table, keys_and_attributes)
                .send()
                .await
                .map_err(|e| Error::store(aws_sdk_dynamodb::Error::from(e)))?;

            if let Some(unprocessed) = output.unprocessed_keys.as_ref().and_then(|u| u.get(table)) {
                warn!(table, unprocessed = unprocessed.keys().len(), "batch get left keys unprocessed");
            }

            if let Some(items) = output.responses.and_then(|mut r| r.remove(table)) {
                found
                    .get_or_insert_with(Vec::new)
                    .extend(items.into_iter().map(from_attribute_map));
            }
        }

        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_conversion() {
        let mut nested = Item::new();
        nested.insert("city".to_string(), Value::string("Lisbon"));

        let value = Value::L(vec![
            Value::number(7),
            Value::Bool(true),
            Value::Null,
            Value::binary(Bytes::from_static(b"\x01\x02")),
            Value::M(nested),
        ]);

        assert_eq!(from_attribute(to_attribute(&value)), value);
    }

    #[test]
    fn test_sets_become_lists() {
        let set = AttributeValue::Ss(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(
            from_attribute(set),
            Value::L(vec![Value::string("a"), Value::string("b")])
        );
    }

    #[test]
    fn test_page_cursor() {
        let mut key = AttributeMap::new();
        key.insert("source".to_string(), AttributeValue::S("user#1".to_string()));

        let page = page(Some(vec![key.clone()]), Some(key));
        assert_eq!(page.items.len(), 1);
        assert_eq!(
            page.cursor.unwrap().key().get("source"),
            Some(&Value::string("user#1"))
        );
    }
}
