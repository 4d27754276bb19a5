/// Stored records and their identity.
///
/// Every record carries `source` (partition key, `<type>#<id>`) and `target`
/// (sort key). A record whose sort key repeats its partition key is a root
/// entity; its display identifier is the partition key minus the type prefix.

use crate::{Error, Item, Result, Value};
use serde::de::DeserializeOwned;

/// Reserved attribute names
pub mod fields {
    pub const SOURCE: &str = "source";
    pub const TARGET: &str = "target";
    pub const ID: &str = "id";
    pub const CREATED_AT: &str = "createdAt";
    pub const UPDATED_AT: &str = "updatedAt";
    pub const DELETED_AT: &str = "deletedAt";

    /// Fields the layer assigns itself
    pub const RESERVED: [&str; 3] = [CREATED_AT, UPDATED_AT, DELETED_AT];
}

/// How a record is identified
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// `source == target`: the key is the application identifier
    Root { id: String },
    /// `source != target`: a relation between two keys
    Edge,
}

/// Strip the type prefix from a composite key (`user#123` -> `123`).
///
/// Every segment after the first is kept, so `doc#a#b` yields `a#b`.
pub fn id_from_key(source: &str, delimiter: char) -> String {
    source
        .split(delimiter)
        .skip(1)
        .collect::<Vec<_>>()
        .join(&delimiter.to_string())
}

/// A normalized record
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    identity: Identity,
    source: String,
    target: String,
    created_at: Option<i64>,
    updated_at: Option<i64>,
    deleted_at: Option<i64>,
    item: Item,
}

impl Entity {
    /// Normalize a stored item.
    ///
    /// Root entities gain an `id` attribute; edges are left untouched.
    pub fn from_item(mut item: Item, delimiter: char) -> Result<Self> {
        let source = key_attribute(&item, fields::SOURCE)?;
        let target = key_attribute(&item, fields::TARGET)?;

        let identity = if source == target {
            let id = id_from_key(&source, delimiter);
            item.insert(fields::ID.to_string(), Value::string(id.clone()));
            Identity::Root { id }
        } else {
            Identity::Edge
        };

        let timestamp = |name: &str| item.get(name).and_then(Value::as_i64);

        Ok(Self {
            identity,
            created_at: timestamp(fields::CREATED_AT),
            updated_at: timestamp(fields::UPDATED_AT),
            deleted_at: timestamp(fields::DELETED_AT),
            source,
            target,
            item,
        })
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Display identifier of a root entity
    pub fn id(&self) -> Option<&str> {
        match &self.identity {
            Identity::Root { id } => Some(id),
            Identity::Edge => None,
        }
    }

    pub fn is_root(&self) -> bool {
        matches!(self.identity, Identity::Root { .. })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn created_at(&self) -> Option<i64> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<i64> {
        self.updated_at
    }

    pub fn deleted_at(&self) -> Option<i64> {
        self.deleted_at
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.item.get(name)
    }

    pub fn item(&self) -> &Item {
        &self.item
    }

    pub fn into_item(self) -> Item {
        self.item
    }

    /// Deserialize the record into an application type
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(crate::item_to_json(&self.item))?)
    }
}

fn key_attribute(item: &Item, name: &str) -> Result<String> {
    item.get(name)
        .and_then(Value::as_string)
        .map(str::to_string)
        .ok_or_else(|| Error::MalformedEntity(format!("missing string attribute '{}'", name)))
}

/// Normalize a batch of stored items, preserving order
pub fn normalize_all(items: Vec<Item>, delimiter: char) -> Result<Vec<Entity>> {
    items
        .into_iter()
        .map(|item| Entity::from_item(item, delimiter))
        .collect()
}
