/// Store client abstraction
///
/// The repository talks to a table through this trait only. Requests carry
/// the compiled [`Expressions`] bundle; implementations forward it verbatim
/// (DynamoDB) or evaluate it in process (memory).

use async_trait::async_trait;
use dinamo_core::{Cursor, Expressions, Item, Page, Result};

/// Query against a table or one of its indexes
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub table: String,
    pub index_name: Option<String>,
    pub expressions: Expressions,
    pub limit: Option<usize>,
    pub scan_index_forward: bool,
    pub exclusive_start_key: Option<Cursor>,
}

impl QueryRequest {
    pub fn new(table: impl Into<String>, expressions: Expressions) -> Self {
        Self {
            table: table.into(),
            index_name: None,
            expressions,
            limit: None,
            scan_index_forward: true,
            exclusive_start_key: None,
        }
    }

    /// Same request resumed from `cursor`
    pub fn resume(&self, cursor: Option<Cursor>) -> Self {
        Self {
            exclusive_start_key: cursor,
            ..self.clone()
        }
    }
}

/// Full-table (or full-index) scan
#[derive(Debug, Clone, PartialEq)]
pub struct ScanRequest {
    pub table: String,
    pub index_name: Option<String>,
    pub expressions: Expressions,
    pub limit: Option<usize>,
    pub exclusive_start_key: Option<Cursor>,
}

impl ScanRequest {
    pub fn new(table: impl Into<String>, expressions: Expressions) -> Self {
        Self {
            table: table.into(),
            index_name: None,
            expressions,
            limit: None,
            exclusive_start_key: None,
        }
    }

    /// Same request resumed from `cursor`
    pub fn resume(&self, cursor: Option<Cursor>) -> Self {
        Self {
            exclusive_start_key: cursor,
            ..self.clone()
        }
    }
}

/// SET update of one record, optionally guarded by a condition
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateRequest {
    pub table: String,
    pub key: Item,
    pub expressions: Expressions,
}

/// Operations the repository needs from a table store
#[async_trait]
pub trait Store: Send + Sync {
    /// Write a full record, replacing any record with the same key
    async fn put(&self, table: &str, item: Item) -> Result<()>;

    /// Fetch one record by primary key
    async fn get(&self, table: &str, key: Item) -> Result<Option<Item>>;

    /// Apply an update expression, creating the record if absent.
    ///
    /// Fails with `ConditionalCheckFailed` when the request carries a
    /// condition the current record does not satisfy.
    async fn update(&self, request: UpdateRequest) -> Result<()>;

    /// Physically remove one record
    async fn delete(&self, table: &str, key: Item) -> Result<()>;

    /// One page of a key-condition query
    async fn query(&self, request: QueryRequest) -> Result<Page<Item>>;

    /// One page of a scan
    async fn scan(&self, request: ScanRequest) -> Result<Page<Item>>;

    /// Fetch several records by key in one round trip.
    ///
    /// Returns None when the store produced no response for the table.
    /// Keys the store leaves unprocessed are not retried, so the result
    /// may be partial; callers compare it against the keys they asked for.
    async fn batch_get(&self, table: &str, keys: Vec<Item>) -> Result<Option<Vec<Item>>>;
}
