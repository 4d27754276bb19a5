/// Batch key reads

use dinamo_core::Item;

/// Batch get builder
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchGet {
    keys: Vec<Item>,
}

impl BatchGet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a primary key to fetch
    pub fn key(mut self, key: Item) -> Self {
        self.keys.push(key);
        self
    }

    /// Add several primary keys
    pub fn keys(mut self, keys: impl IntoIterator<Item = Item>) -> Self {
        self.keys.extend(keys);
        self
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub(crate) fn into_keys(self) -> Vec<Item> {
        self.keys
    }
}
