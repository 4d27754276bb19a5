/// Query builder
///
/// Describes a key-condition read against the table or one of its indexes.

use crate::store::QueryRequest;
use dinamo_core::{soft_delete, Cursor, Entity, Expressions, Fields};

/// Query builder
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    key: Fields,
    filter: Option<Fields>,
    index_name: Option<String>,
    limit: Option<usize>,
    forward: bool,
    start_key: Option<Cursor>,
    recursive: bool,
    filter_deleted: Option<bool>,
}

impl Query {
    /// Create a query from key-condition descriptors
    pub fn new(key: Fields) -> Self {
        Self {
            key,
            filter: None,
            index_name: None,
            limit: None,
            forward: true,
            start_key: None,
            recursive: false,
            filter_deleted: None,
        }
    }

    /// Filter applied to matched records
    pub fn filter(mut self, filter: Fields) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Query a named secondary index instead of the table
    pub fn index(mut self, name: impl Into<String>) -> Self {
        self.index_name = Some(name.into());
        self
    }

    /// Maximum number of records evaluated per page
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set the scan direction (default: forward)
    pub fn forward(mut self, forward: bool) -> Self {
        self.forward = forward;
        self
    }

    /// Resume after a cursor returned by an earlier page
    pub fn start_after(mut self, cursor: Cursor) -> Self {
        self.start_key = Some(cursor);
        self
    }

    /// Follow cursors until the result set is exhausted
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Override the repository's soft-delete filtering for this query
    pub fn filter_deleted(mut self, filter_deleted: bool) -> Self {
        self.filter_deleted = Some(filter_deleted);
        self
    }

    pub(crate) fn is_recursive(&self) -> bool {
        self.recursive
    }

    /// Compile the expressions this query sends
    pub fn expressions(&self, filter_deleted: bool) -> Expressions {
        let mut expressions = Expressions::for_query(&self.key, self.filter.as_ref());
        if self.filter_deleted.unwrap_or(filter_deleted) {
            soft_delete::exclude_deleted(&mut expressions);
        }
        expressions
    }

    /// Store request for the first page
    pub(crate) fn into_request(self, table: &str, filter_deleted: bool) -> QueryRequest {
        QueryRequest {
            table: table.to_string(),
            expressions: self.expressions(filter_deleted),
            index_name: self.index_name,
            limit: self.limit,
            scan_index_forward: self.forward,
            exclusive_start_key: self.start_key,
        }
    }
}

/// Query response
#[derive(Debug, Clone)]
pub struct QueryResponse {
    /// Records returned, in store order
    pub items: Vec<Entity>,
    /// Cursor to resume from; None once exhausted or after a recursive query
    pub last_key: Option<Cursor>,
}

impl QueryResponse {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
