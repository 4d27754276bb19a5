/// Update builder
///
/// Field-level SET updates with optional increments and an optional guard
/// condition. `updatedAt` is assigned by the repository.

use crate::store::UpdateRequest;
use dinamo_core::entity::fields;
use dinamo_core::{Descriptor, Expressions, Fields, Item, Result, Value};
use tracing::warn;

/// Update builder
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    key: Item,
    item: Fields,
    condition: Option<Fields>,
}

impl Update {
    /// Create an update for the record with this primary key
    pub fn new(key: Item) -> Self {
        Self {
            key,
            item: Fields::new(),
            condition: None,
        }
    }

    /// Overwrite a field
    pub fn set(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.item.insert(name, Descriptor::Equals(value.into()));
        self
    }

    /// Atomically add `delta` to a numeric field
    pub fn increment(mut self, name: impl Into<String>, delta: impl Into<Value>) -> Self {
        self.item.insert(name, Descriptor::Increment(delta.into()));
        self
    }

    /// Merge a prepared descriptor set into the update
    pub fn fields(mut self, fields: Fields) -> Self {
        self.item = self.item.merged(&fields);
        self
    }

    /// Only apply when every descriptor matches the stored record
    pub fn condition(mut self, condition: Fields) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn key(&self) -> &Item {
        &self.key
    }

    pub fn is_empty(&self) -> bool {
        self.item.is_empty()
    }

    /// Compile the update, stamping `updatedAt` with `now`.
    ///
    /// Caller-supplied reserved fields are dropped. Only plain values,
    /// increments and nested paths can be assigned.
    pub fn expressions(&self, now: i64) -> Result<Expressions> {
        let mut item = self.item.clone();
        for name in fields::RESERVED {
            if item.remove(name).is_some() {
                warn!(field = name, "dropping caller-supplied reserved field");
            }
        }
        item.insert(fields::UPDATED_AT, Descriptor::Equals(Value::number(now)));
        Expressions::for_update(&item, self.condition.as_ref())
    }

    pub(crate) fn into_request(self, table: &str, now: i64) -> Result<UpdateRequest> {
        Ok(UpdateRequest {
            table: table.to_string(),
            expressions: self.expressions(now)?,
            key: self.key,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> Item {
        let mut key = Item::new();
        key.insert("source".to_string(), Value::string("user#1"));
        key.insert("target".to_string(), Value::string("user#1"));
        key
    }

    #[test]
    fn test_update_builder() {
        let update = Update::new(key()).set("name", "Bob").increment("visits", 1);
        let expressions = update.expressions(1_700_000_000_000).unwrap();

        assert_eq!(
            expressions.update.as_deref(),
            Some("set #name = :name, #updatedAt = :updatedAt, #visits = #visits + :visits")
        );
        assert_eq!(
            expressions.values.unwrap().get(":updatedAt"),
            Some(&Value::number(1_700_000_000_000i64))
        );
    }

    #[test]
    fn test_update_with_condition() {
        let update = Update::new(key())
            .set("status", "live")
            .condition(Fields::new().eq("status", "draft").eq("version", 3));

        let request = update.into_request("entities", 5).unwrap();
        let expressions = &request.expressions;
        assert_eq!(
            expressions.condition.as_deref(),
            Some("#status = :ifStatus AND #version = :ifVersion")
        );
        let values = expressions.values.as_ref().unwrap();
        assert_eq!(values.get(":status"), Some(&Value::string("live")));
        assert_eq!(values.get(":ifStatus"), Some(&Value::string("draft")));
        assert_eq!(request.key, key());
    }

    #[test]
    fn test_fields_merge() {
        let update = Update::new(key())
            .set("a", 1)
            .fields(Fields::new().eq("a", 2).increment("b", 3));

        let expressions = update.expressions(0).unwrap();
        let values = expressions.values.unwrap();
        assert_eq!(values.get(":a"), Some(&Value::number(2)));
        assert_eq!(values.get(":b"), Some(&Value::number(3)));
    }

    #[test]
    fn test_reserved_fields_are_dropped() {
        let update = Update::new(key())
            .set("createdAt", 1)
            .set("deletedAt", 2)
            .set("updatedAt", 3)
            .set("name", "Al");

        let expressions = update.expressions(99).unwrap();
        assert_eq!(
            expressions.update.as_deref(),
            Some("set #name = :name, #updatedAt = :updatedAt")
        );
        let values = expressions.values.unwrap();
        assert_eq!(values.get(":updatedAt"), Some(&Value::number(99)));
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn test_comparison_cannot_be_assigned() {
        let update = Update::new(key()).fields(Fields::new().between("score", 1, 5));
        let err = update.into_request("entities", 0).unwrap_err();
        assert_eq!(err.code(), "INVALID_ARGUMENT");
    }
}
