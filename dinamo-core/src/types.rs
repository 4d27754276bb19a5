use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

/// DynamoDB-style typed value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Number (stored as string for precision)
    N(String),
    /// String
    S(String),
    /// Binary
    B(Bytes),
    /// Boolean
    Bool(bool),
    /// Null
    Null,
    /// List
    L(Vec<Value>),
    /// Map
    M(HashMap<String, Value>),
}

impl Value {
    pub fn string(s: impl Into<String>) -> Self {
        Value::S(s.into())
    }

    pub fn number(n: impl ToString) -> Self {
        Value::N(n.to_string())
    }

    pub fn binary(b: impl Into<Bytes>) -> Self {
        Value::B(b.into())
    }

    pub fn map(m: HashMap<String, Value>) -> Self {
        Value::M(m)
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            Value::S(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::N(n) => n.parse().ok(),
            _ => None,
        }
    }

    /// Integer view of a number, used for epoch-millisecond timestamps.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::N(n) => n
                .parse::<i64>()
                .ok()
                .or_else(|| n.parse::<f64>().ok().map(|f| f as i64)),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&HashMap<String, Value>> {
        match self {
            Value::M(m) => Some(m),
            _ => None,
        }
    }

    /// Orders two values of the same scalar type.
    ///
    /// Numbers compare numerically, strings and binaries lexicographically.
    /// Returns None for mismatched or non-scalar types.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::N(_), Value::N(_)) => self.as_f64()?.partial_cmp(&other.as_f64()?),
            (Value::S(l), Value::S(r)) => Some(l.cmp(r)),
            (Value::B(l), Value::B(r)) => Some(l.cmp(r)),
            (Value::Bool(l), Value::Bool(r)) => Some(l.cmp(r)),
            (Value::Null, Value::Null) => Some(Ordering::Equal),
            _ => None,
        }
    }

    /// Convert a JSON value into a typed value
    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::String(s) => Value::string(s.clone()),
            serde_json::Value::Number(n) => Value::number(n),
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Array(arr) => Value::L(arr.iter().map(Value::from_json).collect()),
            serde_json::Value::Object(obj) => Value::M(
                obj.iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Convert a typed value into JSON
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::S(s) => serde_json::Value::String(s.clone()),
            Value::N(n) => {
                if let Ok(i) = n.parse::<i64>() {
                    serde_json::Value::Number(i.into())
                } else if let Ok(f) = n.parse::<f64>() {
                    serde_json::Number::from_f64(f)
                        .map(serde_json::Value::Number)
                        .unwrap_or_else(|| serde_json::Value::String(n.clone()))
                } else {
                    serde_json::Value::String(n.clone())
                }
            }
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Null => serde_json::Value::Null,
            Value::L(list) => serde_json::Value::Array(list.iter().map(Value::to_json).collect()),
            Value::M(map) => item_to_json(map),
            Value::B(bytes) => serde_json::Value::Array(
                bytes.iter().map(|b| serde_json::Value::Number((*b).into())).collect(),
            ),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::S(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

macro_rules! number_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(n: $ty) -> Self {
                    Value::number(n)
                }
            }
        )*
    };
}

number_from!(i32, i64, u32, u64, usize, f64);

/// Item - a map of attribute names to values
pub type Item = HashMap<String, Value>;

/// Convert an item into a JSON object
pub fn item_to_json(item: &Item) -> serde_json::Value {
    let obj = item
        .iter()
        .map(|(k, v)| (k.clone(), v.to_json()))
        .collect::<serde_json::Map<_, _>>();
    serde_json::Value::Object(obj)
}

/// Convert a JSON object into an item. Non-object input yields an empty item.
pub fn json_to_item(json: &serde_json::Value) -> Item {
    match json {
        serde_json::Value::Object(obj) => obj
            .iter()
            .map(|(k, v)| (k.clone(), Value::from_json(v)))
            .collect(),
        _ => Item::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_types() {
        let s = Value::string("hello");
        assert_eq!(s.as_string(), Some("hello"));

        let mut map = HashMap::new();
        map.insert("name".to_string(), Value::string("Alice"));
        let v = Value::map(map);
        assert!(v.as_map().is_some());
    }

    #[test]
    fn test_value_from_primitives() {
        assert_eq!(Value::from(3), Value::N("3".into()));
        assert_eq!(Value::from("Al"), Value::S("Al".into()));
        assert_eq!(Value::from(true), Value::Bool(true));
        assert_eq!(Value::from(1.5), Value::N("1.5".into()));
    }

    #[test]
    fn test_timestamp_view() {
        let now = 1609459200000i64;
        assert_eq!(Value::number(now).as_i64(), Some(now));
        assert_eq!(Value::N("12.0".into()).as_i64(), Some(12));
        assert_eq!(Value::string("12").as_i64(), None);
    }

    #[test]
    fn test_compare() {
        assert_eq!(Value::from(9).compare(&Value::from(10)), Some(Ordering::Less));
        assert_eq!(Value::from("b").compare(&Value::from("a")), Some(Ordering::Greater));
        assert_eq!(Value::N("5".into()).compare(&Value::N("5.0".into())), Some(Ordering::Equal));
        assert_eq!(Value::from(1).compare(&Value::from("1")), None);
    }

    #[test]
    fn test_json_bridge() {
        let json = serde_json::json!({
            "name": "Alice",
            "age": 30,
            "tags": ["a", "b"],
            "address": { "city": "Lisbon" },
            "active": true,
        });

        let item = json_to_item(&json);
        assert_eq!(item.get("age"), Some(&Value::N("30".into())));
        assert_eq!(
            item.get("address").and_then(|v| v.as_map()).and_then(|m| m.get("city")),
            Some(&Value::string("Lisbon"))
        );

        assert_eq!(item_to_json(&item), json);
    }
}
