/// In-process store
///
/// Evaluates the compiled expression dialect against items held in memory,
/// following DynamoDB's paging rules: `limit` caps the number of items
/// *evaluated* per page (the filter runs afterwards), and a page that stops
/// early returns the last evaluated key as its cursor.

use crate::store::{QueryRequest, ScanRequest, Store, UpdateRequest};
use async_trait::async_trait;
use dinamo_core::evaluator::{self, ConditionParser, Evaluator, Expr, ExpressionContext, UpdateExecutor, UpdateParser};
use dinamo_core::{Cursor, Error, Expressions, Item, Page, Result};
use parking_lot::RwLock;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, trace};

/// Partition key and optional sort key attribute names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySchema {
    pub partition_key: String,
    pub sort_key: Option<String>,
}

impl KeySchema {
    pub fn new(partition_key: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            sort_key: None,
        }
    }

    pub fn with_sort_key(mut self, sort_key: impl Into<String>) -> Self {
        self.sort_key = Some(sort_key.into());
        self
    }

    fn attributes(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.partition_key.as_str()).chain(self.sort_key.as_deref())
    }
}

/// Table layout: primary key plus named secondary indexes
#[derive(Debug, Clone, PartialEq)]
pub struct TableDefinition {
    pub name: String,
    pub key: KeySchema,
    pub indexes: HashMap<String, KeySchema>,
}

impl TableDefinition {
    pub fn new(name: impl Into<String>, key: KeySchema) -> Self {
        Self {
            name: name.into(),
            key,
            indexes: HashMap::new(),
        }
    }

    pub fn with_index(mut self, name: impl Into<String>, key: KeySchema) -> Self {
        self.indexes.insert(name.into(), key);
        self
    }

    /// Attributes a query or scan orders by, most significant first.
    ///
    /// Index reads order by the index key, then the table key.
    fn ordering(&self, index_name: Option<&str>) -> Result<Vec<String>> {
        let mut attributes = Vec::new();
        if let Some(name) = index_name {
            let index = self
                .indexes
                .get(name)
                .ok_or_else(|| Error::InvalidArgument(format!("table '{}' has no index '{}'", self.name, name)))?;
            attributes.extend(index.attributes().map(str::to_string));
        }
        for attribute in self.key.attributes() {
            if !attributes.iter().any(|a| a == attribute) {
                attributes.push(attribute.to_string());
            }
        }
        Ok(attributes)
    }
}

#[derive(Debug)]
struct MemoryTable {
    definition: TableDefinition,
    /// Records keyed by their canonical primary key
    items: BTreeMap<String, Item>,
}

impl MemoryTable {
    fn primary_key(&self, item: &Item) -> Result<String> {
        let mut parts = Vec::with_capacity(2);
        for attribute in self.definition.key.attributes() {
            let value = item.get(attribute).ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "missing key attribute '{}' for table '{}'",
                    attribute, self.definition.name
                ))
            })?;
            parts.push(value);
        }
        Ok(serde_json::to_string(&parts)?)
    }

    /// Key attributes of `item`, as the store's key
    fn key_of(&self, item: &Item) -> Item {
        project(item, self.definition.key.attributes())
    }

    /// Items in read order, restricted to those carrying every ordering attribute
    fn ordered(&self, ordering: &[String], forward: bool) -> Vec<&Item> {
        let mut items: Vec<&Item> = self
            .items
            .values()
            .filter(|item| ordering.iter().all(|a| item.contains_key(a)))
            .collect();
        items.sort_by(|a, b| compare_on(ordering, a, b));
        if !forward {
            items.reverse();
        }
        items
    }
}

fn project<'a>(item: &Item, attributes: impl IntoIterator<Item = &'a str>) -> Item {
    attributes
        .into_iter()
        .filter_map(|a| item.get(a).map(|v| (a.to_string(), v.clone())))
        .collect()
}

fn compare_on(ordering: &[String], a: &Item, b: &Item) -> Ordering {
    for attribute in ordering {
        let ord = match (a.get(attribute), b.get(attribute)) {
            (Some(x), Some(y)) => x.compare(y).unwrap_or(Ordering::Equal),
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

fn parse(expression: Option<&str>) -> Result<Option<Expr>> {
    expression.map(ConditionParser::parse).transpose()
}

/// Compiled read request shared by query and scan
struct Read<'r> {
    index_name: Option<&'r str>,
    expressions: &'r Expressions,
    key_condition: Option<Expr>,
    filter: Option<Expr>,
    limit: Option<usize>,
    forward: bool,
    start: Option<&'r Cursor>,
}

/// Thread-safe in-memory table store.
///
/// Clones share the same tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<HashMap<String, MemoryTable>>>,
    page_size: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap every page at `page_size` evaluated items, regardless of `limit`
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size.max(1));
        self
    }

    /// Create (or replace) a table
    pub fn create_table(&self, definition: TableDefinition) {
        debug!(table = %definition.name, "creating memory table");
        self.tables.write().insert(
            definition.name.clone(),
            MemoryTable {
                definition,
                items: BTreeMap::new(),
            },
        );
    }

    /// Number of records in a table, including soft-deleted ones
    pub fn item_count(&self, table: &str) -> Result<usize> {
        let tables = self.tables.read();
        let table = lookup(&tables, table)?;
        Ok(table.items.len())
    }

    fn read(&self, table: &str, read: Read<'_>) -> Result<Page<Item>> {
        let tables = self.tables.read();
        let table = lookup(&tables, table)?;
        let ordering = table.definition.ordering(read.index_name)?;
        let context = ExpressionContext::from_expressions(read.expressions);

        let mut candidates = Vec::new();
        for item in table.ordered(&ordering, read.forward) {
            let matched = match &read.key_condition {
                Some(expr) => Evaluator::new(item, &context).evaluate(expr)?,
                None => true,
            };
            if matched {
                candidates.push(item);
            }
        }

        if let Some(cursor) = read.start {
            let target = if read.forward { Ordering::Greater } else { Ordering::Less };
            candidates.retain(|item| compare_on(&ordering, item, cursor.key()) == target);
        }

        let cap = match (read.limit, self.page_size) {
            (Some(limit), Some(size)) => limit.min(size),
            (limit, size) => limit.or(size).unwrap_or(usize::MAX),
        };
        let evaluated = &candidates[..cap.min(candidates.len())];

        let mut items = Vec::new();
        for item in evaluated {
            let keep = match &read.filter {
                Some(expr) => Evaluator::new(item, &context).evaluate(expr)?,
                None => true,
            };
            if keep {
                items.push((*item).clone());
            }
        }

        let cursor = match evaluated.last() {
            Some(last) if evaluated.len() < candidates.len() => Some(Cursor::new(project(
                last,
                ordering.iter().map(String::as_str),
            ))),
            _ => None,
        };

        trace!(evaluated = evaluated.len(), returned = items.len(), more = cursor.is_some(), "memory read");
        Ok(Page::new(items, cursor))
    }
}

fn lookup<'t>(tables: &'t HashMap<String, MemoryTable>, name: &str) -> Result<&'t MemoryTable> {
    tables
        .get(name)
        .ok_or_else(|| Error::TableNotFound(name.to_string()))
}

fn lookup_mut<'t>(tables: &'t mut HashMap<String, MemoryTable>, name: &str) -> Result<&'t mut MemoryTable> {
    tables
        .get_mut(name)
        .ok_or_else(|| Error::TableNotFound(name.to_string()))
}

#[async_trait]
impl Store for MemoryStore {
    async fn put(&self, table: &str, item: Item) -> Result<()> {
        let mut tables = self.tables.write();
        let table = lookup_mut(&mut tables, table)?;
        let key = table.primary_key(&item)?;
        table.items.insert(key, item);
        Ok(())
    }

    async fn get(&self, table: &str, key: Item) -> Result<Option<Item>> {
        let tables = self.tables.read();
        let table = lookup(&tables, table)?;
        let key = table.primary_key(&key)?;
        Ok(table.items.get(&key).cloned())
    }

    async fn update(&self, request: UpdateRequest) -> Result<()> {
        let update = request
            .expressions
            .update
            .as_deref()
            .ok_or_else(|| Error::InvalidArgument("update request has no update expression".into()))?;
        let actions = UpdateParser::parse(update)?;
        let context = ExpressionContext::from_expressions(&request.expressions);

        let mut tables = self.tables.write();
        let table = lookup_mut(&mut tables, &request.table)?;
        let key = table.primary_key(&request.key)?;

        let current = table
            .items
            .get(&key)
            .cloned()
            .unwrap_or_else(|| table.key_of(&request.key));

        let condition = request.expressions.condition.as_deref();
        if !evaluator::matches(condition, &current, &context)? {
            return Err(Error::ConditionalCheckFailed(format!(
                "condition '{}' not met",
                condition.unwrap_or_default()
            )));
        }

        let updated = UpdateExecutor::new(&context).execute(&current, &actions)?;
        if table.primary_key(&updated)? != key {
            return Err(Error::InvalidArgument("update must not change key attributes".into()));
        }
        table.items.insert(key, updated);
        Ok(())
    }

    async fn delete(&self, table: &str, key: Item) -> Result<()> {
        let mut tables = self.tables.write();
        let table = lookup_mut(&mut tables, table)?;
        let key = table.primary_key(&key)?;
        table.items.remove(&key);
        Ok(())
    }

    async fn query(&self, request: QueryRequest) -> Result<Page<Item>> {
        let expressions = &request.expressions;
        if expressions.key_condition.is_none() {
            return Err(Error::InvalidArgument("query requires a key condition".into()));
        }

        self.read(
            &request.table,
            Read {
                index_name: request.index_name.as_deref(),
                expressions,
                key_condition: parse(expressions.key_condition.as_deref())?,
                filter: parse(expressions.filter.as_deref())?,
                limit: request.limit,
                forward: request.scan_index_forward,
                start: request.exclusive_start_key.as_ref(),
            },
        )
    }

    async fn scan(&self, request: ScanRequest) -> Result<Page<Item>> {
        let expressions = &request.expressions;
        self.read(
            &request.table,
            Read {
                index_name: request.index_name.as_deref(),
                expressions,
                key_condition: None,
                filter: parse(expressions.filter.as_deref())?,
                limit: request.limit,
                forward: true,
                start: request.exclusive_start_key.as_ref(),
            },
        )
    }

    async fn batch_get(&self, table: &str, keys: Vec<Item>) -> Result<Option<Vec<Item>>> {
        let tables = self.tables.read();
        let table = lookup(&tables, table)?;

        let mut found = Vec::with_capacity(keys.len());
        for key in &keys {
            if let Some(item) = table.items.get(&table.primary_key(key)?) {
                found.push(item.clone());
            }
        }
        Ok(Some(found))
    }
}
