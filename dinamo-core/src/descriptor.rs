/// Field descriptors: what a query, filter, or update says about one field.
///
/// A descriptor is either a plain value (equality / overwrite) or one of the
/// operator wrappers understood by the expression compiler.

use crate::{Item, Value};
use std::collections::BTreeMap;

/// Operator applied to a single field
#[derive(Debug, Clone, PartialEq)]
pub enum Descriptor {
    /// field = value
    Equals(Value),
    /// field < value
    LessThan(Value),
    /// field <= value
    LessOrEqual(Value),
    /// field >= value
    GreaterOrEqual(Value),
    /// begins_with(field, value)
    BeginsWith(Value),
    /// field BETWEEN low AND high (inclusive)
    Between(Value, Value),
    /// field = first OR field = second
    Or(Value, Value),
    /// field = field + delta (updates only)
    Increment(Value),
    /// field.sub = value for every sub-field
    NestedPath(BTreeMap<String, Value>),
}

impl From<Value> for Descriptor {
    fn from(value: Value) -> Self {
        Descriptor::Equals(value)
    }
}

/// A set of field descriptors keyed by field name.
///
/// Field names are unique; inserting a field twice keeps the last descriptor.
/// Iteration is ordered by field name so compiled output is deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fields {
    fields: BTreeMap<String, Descriptor>,
}

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field with an explicit descriptor
    pub fn with(mut self, name: impl Into<String>, descriptor: Descriptor) -> Self {
        self.fields.insert(name.into(), descriptor);
        self
    }

    pub fn eq(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(name, Descriptor::Equals(value.into()))
    }

    pub fn lt(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(name, Descriptor::LessThan(value.into()))
    }

    pub fn lte(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(name, Descriptor::LessOrEqual(value.into()))
    }

    pub fn gte(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(name, Descriptor::GreaterOrEqual(value.into()))
    }

    pub fn begins_with(self, name: impl Into<String>, prefix: impl Into<Value>) -> Self {
        self.with(name, Descriptor::BeginsWith(prefix.into()))
    }

    pub fn between(
        self,
        name: impl Into<String>,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> Self {
        self.with(name, Descriptor::Between(low.into(), high.into()))
    }

    pub fn or(
        self,
        name: impl Into<String>,
        first: impl Into<Value>,
        second: impl Into<Value>,
    ) -> Self {
        self.with(name, Descriptor::Or(first.into(), second.into()))
    }

    pub fn increment(self, name: impl Into<String>, delta: impl Into<Value>) -> Self {
        self.with(name, Descriptor::Increment(delta.into()))
    }

    /// Equality on several sub-fields of one map attribute
    pub fn nested<K, V>(self, name: impl Into<String>, paths: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let paths = paths
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.with(name, Descriptor::NestedPath(paths))
    }

    pub fn insert(&mut self, name: impl Into<String>, descriptor: Descriptor) -> Option<Descriptor> {
        self.fields.insert(name.into(), descriptor)
    }

    pub fn get(&self, name: &str) -> Option<&Descriptor> {
        self.fields.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Descriptor> {
        self.fields.remove(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Descriptor)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Union of two sets; on a shared field name `other` wins.
    pub fn merged(&self, other: &Fields) -> Fields {
        let mut fields = self.fields.clone();
        fields.extend(other.fields.iter().map(|(k, v)| (k.clone(), v.clone())));
        Fields { fields }
    }

    /// Plain-equality view of the set, as an item (used for primary keys).
    /// Returns None if any field carries an operator wrapper.
    pub fn to_item(&self) -> Option<Item> {
        self.fields
            .iter()
            .map(|(k, d)| match d {
                Descriptor::Equals(v) => Some((k.clone(), v.clone())),
                _ => None,
            })
            .collect()
    }
}

impl<K: Into<String>> FromIterator<(K, Descriptor)> for Fields {
    fn from_iter<I: IntoIterator<Item = (K, Descriptor)>>(iter: I) -> Self {
        Fields {
            fields: iter.into_iter().map(|(k, d)| (k.into(), d)).collect(),
        }
    }
}

impl From<Item> for Fields {
    fn from(item: Item) -> Self {
        item.into_iter()
            .map(|(k, v)| (k, Descriptor::Equals(v)))
            .collect()
    }
}
