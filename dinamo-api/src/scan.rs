/// Scan builder
///
/// Reads every record of the table (or index) that passes the filter.

use crate::store::ScanRequest;
use dinamo_core::{soft_delete, Cursor, Entity, Expressions, Fields};

/// Scan builder
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scan {
    filter: Option<Fields>,
    index_name: Option<String>,
    limit: Option<usize>,
    start_key: Option<Cursor>,
    recursive: bool,
    filter_deleted: Option<bool>,
}

impl Scan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Fields) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn index(mut self, name: impl Into<String>) -> Self {
        self.index_name = Some(name.into());
        self
    }

    /// Maximum number of records evaluated per page
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn start_after(mut self, cursor: Cursor) -> Self {
        self.start_key = Some(cursor);
        self
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn filter_deleted(mut self, filter_deleted: bool) -> Self {
        self.filter_deleted = Some(filter_deleted);
        self
    }

    pub(crate) fn is_recursive(&self) -> bool {
        self.recursive
    }

    pub fn expressions(&self, filter_deleted: bool) -> Expressions {
        let mut expressions = Expressions::for_scan(self.filter.as_ref());
        if self.filter_deleted.unwrap_or(filter_deleted) {
            soft_delete::exclude_deleted(&mut expressions);
        }
        expressions
    }

    pub(crate) fn into_request(self, table: &str, filter_deleted: bool) -> ScanRequest {
        ScanRequest {
            table: table.to_string(),
            expressions: self.expressions(filter_deleted),
            index_name: self.index_name,
            limit: self.limit,
            exclusive_start_key: self.start_key,
        }
    }
}

/// Scan response
#[derive(Debug, Clone)]
pub struct ScanResponse {
    pub items: Vec<Entity>,
    pub last_key: Option<Cursor>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_builder() {
        let scan = Scan::new()
            .filter(Fields::new().eq("kind", "post"))
            .limit(25)
            .recursive(true);
        assert!(scan.is_recursive());

        let request = scan.into_request("entities", true);
        assert_eq!(request.limit, Some(25));
        assert_eq!(
            request.expressions.filter.as_deref(),
            Some("#kind = :kind AND attribute_not_exists(#deletedAt)")
        );
        assert!(request.expressions.key_condition.is_none());
    }

    #[test]
    fn test_unfiltered_scan() {
        let expressions = Scan::new().expressions(false);
        assert_eq!(expressions, Expressions::default());
    }
}
