/// Delete builder
///
/// Soft deletes stamp `deletedAt` and keep the record readable by key; hard
/// deletes remove it from the store.

use dinamo_core::Item;

/// Delete builder
#[derive(Debug, Clone, PartialEq)]
pub struct Delete {
    key: Item,
    soft: Option<bool>,
}

impl Delete {
    /// Delete the record with this primary key
    pub fn new(key: Item) -> Self {
        Self { key, soft: None }
    }

    /// Choose soft or hard deletion, overriding the repository default
    pub fn soft(mut self, soft: bool) -> Self {
        self.soft = Some(soft);
        self
    }

    /// Physically remove the record
    pub fn hard(self) -> Self {
        self.soft(false)
    }

    pub fn key(&self) -> &Item {
        &self.key
    }

    /// Whether this delete is soft, given the repository default
    pub fn is_soft(&self, default: bool) -> bool {
        self.soft.unwrap_or(default)
    }

    pub(crate) fn into_key(self) -> Item {
        self.key
    }
}
