use dinamo_core::entity::{self, fields};
use dinamo_core::{pagination, soft_delete, Entity, Error, Expressions, Item, Page, RepositoryConfig, Result, Value};
use futures::{future, Stream, TryStreamExt};
use std::collections::HashMap;
use tracing::{debug, info, warn};

pub use dinamo_core::{Cursor, Error as DinamoError, Fields, Value as DinamoValue};

pub mod store;
pub use store::{QueryRequest, ScanRequest, Store, UpdateRequest};

pub mod memory;
pub use memory::{KeySchema, MemoryStore, TableDefinition};

#[cfg(feature = "dynamodb")]
pub mod dynamo;
#[cfg(feature = "dynamodb")]
pub use dynamo::DynamoStore;

pub mod query;
pub use query::{Query, QueryResponse};

pub mod scan;
pub use scan::{Scan, ScanResponse};

pub mod update;
pub use update::Update;

pub mod delete;
pub use delete::Delete;

pub mod batch;
pub use batch::BatchGet;

/// Current time in epoch milliseconds
fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Record access for one table.
///
/// Every read path normalizes records into [`Entity`] values; query and scan
/// exclude soft-deleted records unless told otherwise.
pub struct Repository<S> {
    store: S,
    config: RepositoryConfig,
}

impl<S: Store> Repository<S> {
    /// Create a repository over `store`
    pub fn new(store: S, config: RepositoryConfig) -> Result<Self> {
        config.validate().map_err(Error::InvalidArgument)?;
        Ok(Self { store, config })
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn table(&self) -> &str {
        &self.config.table_name
    }

    fn normalize(&self, item: Item) -> Result<Entity> {
        Entity::from_item(item, self.config.key_delimiter)
    }

    /// Write a new record, stamping `createdAt`.
    ///
    /// Overwrites any record with the same key. Reserved timestamp fields
    /// supplied by the caller are dropped.
    pub async fn create(&self, mut item: Item) -> Result<Entity> {
        for name in fields::RESERVED {
            if item.remove(name).is_some() {
                warn!(field = name, "dropping caller-supplied reserved field");
            }
        }
        item.insert(fields::CREATED_AT.to_string(), Value::number(now_millis()));

        let entity = self.normalize(item.clone())?;
        debug!(table = self.table(), source = entity.source(), target = entity.target(), "put");
        self.store.put(self.table(), item).await?;
        Ok(entity)
    }

    /// Fetch one record by primary key, deleted or not
    pub async fn read(&self, key: Item) -> Result<Option<Entity>> {
        debug!(table = self.table(), "get");
        self.store
            .get(self.table(), key)
            .await?
            .map(|item| self.normalize(item))
            .transpose()
    }

    /// Apply an update, stamping `updatedAt`, and return the stored record
    pub async fn update(&self, update: Update) -> Result<Option<Entity>> {
        let key = update.key().clone();
        let request = update.into_request(self.table(), now_millis())?;
        debug!(
            table = %request.table,
            update = ?request.expressions.update,
            condition = ?request.expressions.condition,
            "update"
        );

        self.store.update(request).await?;
        self.read(key).await
    }

    /// Run a query: one page, or every page when the query is recursive
    pub async fn query(&self, query: Query) -> Result<QueryResponse> {
        let recursive = query.is_recursive();
        let request = query.into_request(self.table(), self.config.filter_deleted);
        debug!(
            table = %request.table,
            index = ?request.index_name,
            key_condition = ?request.expressions.key_condition,
            filter = ?request.expressions.filter,
            recursive,
            "query"
        );

        let start = request.exclusive_start_key.clone();
        let page = pagination::collect(start, recursive, |cursor| {
            self.store.query(request.resume(cursor))
        })
        .await?
        .try_map(|item| self.normalize(item))?;

        Ok(QueryResponse {
            items: page.items,
            last_key: page.cursor,
        })
    }

    /// Lazy stream of query pages, following cursors until exhausted
    pub fn query_pages(&self, query: Query) -> impl Stream<Item = Result<Page<Entity>>> + '_ {
        let request = query.into_request(self.table(), self.config.filter_deleted);
        let delimiter = self.config.key_delimiter;

        pagination::pages(request.exclusive_start_key.clone(), move |cursor| {
            self.store.query(request.resume(cursor))
        })
        .and_then(move |page| future::ready(page.try_map(|item| Entity::from_item(item, delimiter))))
    }

    /// Fetch several records by key in one call.
    ///
    /// Missing keys are skipped; a store that returns no response yields an
    /// empty result.
    pub async fn batch_get(&self, batch: BatchGet) -> Result<Vec<Entity>> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        debug!(table = self.table(), keys = batch.len(), "batch get");
        match self.store.batch_get(self.table(), batch.into_keys()).await? {
            Some(items) => entity::normalize_all(items, self.config.key_delimiter),
            None => {
                warn!(table = self.table(), "batch get returned no responses");
                Ok(Vec::new())
            }
        }
    }

    /// Run a scan: one page, or every page when the scan is recursive
    pub async fn scan(&self, scan: Scan) -> Result<ScanResponse> {
        let recursive = scan.is_recursive();
        let request = scan.into_request(self.table(), self.config.filter_deleted);
        debug!(
            table = %request.table,
            index = ?request.index_name,
            filter = ?request.expressions.filter,
            recursive,
            "scan"
        );

        let start = request.exclusive_start_key.clone();
        let page = pagination::collect(start, recursive, |cursor| {
            self.store.scan(request.resume(cursor))
        })
        .await?
        .try_map(|item| self.normalize(item))?;

        Ok(ScanResponse {
            items: page.items,
            last_key: page.cursor,
        })
    }

    /// Lazy stream of scan pages, following cursors until exhausted
    pub fn scan_pages(&self, scan: Scan) -> impl Stream<Item = Result<Page<Entity>>> + '_ {
        let request = scan.into_request(self.table(), self.config.filter_deleted);
        let delimiter = self.config.key_delimiter;

        pagination::pages(request.exclusive_start_key.clone(), move |cursor| {
            self.store.scan(request.resume(cursor))
        })
        .and_then(move |page| future::ready(page.try_map(|item| Entity::from_item(item, delimiter))))
    }

    /// Delete a record.
    ///
    /// A soft delete stamps `deletedAt` and returns the updated record; a hard
    /// delete removes it and returns None.
    pub async fn delete(&self, delete: Delete) -> Result<Option<Entity>> {
        if !delete.is_soft(self.config.soft_delete) {
            info!(table = self.table(), "hard delete");
            self.store.delete(self.table(), delete.into_key()).await?;
            return Ok(None);
        }

        let key = delete.into_key();
        let marker = soft_delete::deletion_marker(now_millis());
        info!(table = self.table(), "soft delete");

        self.store
            .update(UpdateRequest {
                table: self.table().to_string(),
                key: key.clone(),
                expressions: Expressions::for_update(&marker, None)?,
            })
            .await?;
        self.read(key).await
    }
}

/// Helper to build items
pub struct ItemBuilder {
    item: HashMap<String, Value>,
}

impl ItemBuilder {
    pub fn new() -> Self {
        Self {
            item: HashMap::new(),
        }
    }

    /// Start a record with its `source` and `target` keys
    pub fn entity(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new()
            .string(fields::SOURCE, source)
            .string(fields::TARGET, target)
    }

    /// Start a root record, whose target repeats its source
    pub fn root(source: impl Into<String>) -> Self {
        let source = source.into();
        Self::entity(source.clone(), source)
    }

    pub fn string(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.item.insert(key.into(), Value::string(value.into()));
        self
    }

    pub fn number(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.item.insert(key.into(), Value::number(value));
        self
    }

    pub fn bool(mut self, key: impl Into<String>, value: bool) -> Self {
        self.item.insert(key.into(), Value::Bool(value));
        self
    }

    pub fn value(mut self, key: impl Into<String>, value: Value) -> Self {
        self.item.insert(key.into(), value);
        self
    }

    pub fn build(self) -> Item {
        self.item
    }
}

impl Default for ItemBuilder {
    fn default() -> Self {
        Self::new()
    }
}
