//! Dynamic value type for socket data.
//!
//! Every value moved along a connection is a `Value`. The engine treats
//! values as opaque; the accessors here exist for components that need to
//! route on payload fields (e.g. a router checking a score).

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Dynamic value exchanged between component sockets.
///
/// Wraps `serde_json::Value` to provide typed field extraction and the list
/// handling used for variadic inputs. Cloning a `Value` is a deep copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Value(pub JsonValue);

impl Value {
    /// Create a null value.
    #[must_use]
    pub fn null() -> Self {
        Self(JsonValue::Null)
    }

    /// Create a boolean value.
    #[must_use]
    pub fn bool(v: bool) -> Self {
        Self(JsonValue::Bool(v))
    }

    /// Create an integer value.
    #[must_use]
    pub fn int(v: i64) -> Self {
        Self(JsonValue::Number(v.into()))
    }

    /// Create a floating-point value.
    #[must_use]
    pub fn float(v: f64) -> Self {
        Self(serde_json::Number::from_f64(v).map_or(JsonValue::Null, JsonValue::Number))
    }

    /// Create a string value.
    pub fn string(v: impl Into<String>) -> Self {
        Self(JsonValue::String(v.into()))
    }

    /// Create a list value.
    ///
    /// Variadic input sockets accumulate their contributions into a list,
    /// so variadic consumers always receive one of these.
    #[must_use]
    pub fn array(items: Vec<Value>) -> Self {
        Self(JsonValue::Array(items.into_iter().map(|v| v.0).collect()))
    }

    /// Check if the value is null.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.0.is_null()
    }

    /// Get a field by path (dot notation).
    ///
    /// Supports:
    /// - Simple field access: "field"
    /// - Dot notation: "parent.child.value"
    /// - Array index notation: "items[0].name"
    ///
    /// Returns None if the field doesn't exist.
    #[must_use]
    pub fn get_field(&self, path: &str) -> Option<Value> {
        let mut current = &self.0;
        for part in path.split('.') {
            if let Some((field, idx_str)) = part.split_once('[') {
                current = current.get(field)?;
                let idx_str = idx_str.strip_suffix(']')?;
                let idx: usize = idx_str.parse().ok()?;
                current = current.get(idx)?;
            } else {
                current = current.get(part)?;
            }
        }
        Some(Value(current.clone()))
    }

    /// Convert to string if possible.
    #[must_use]
    pub fn as_string(&self) -> Option<String> {
        match &self.0 {
            JsonValue::String(s) => Some(s.clone()),
            JsonValue::Number(n) => Some(n.to_string()),
            JsonValue::Bool(b) => Some(b.to_string()),
            JsonValue::Null => None,
            _ => Some(self.0.to_string()),
        }
    }

    /// Convert to i64 if possible.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match &self.0 {
            JsonValue::Number(n) => n.as_i64(),
            JsonValue::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Convert to f64 if possible.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match &self.0 {
            JsonValue::Number(n) => n.as_f64(),
            JsonValue::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Convert to bool if possible.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match &self.0 {
            JsonValue::Bool(b) => Some(*b),
            JsonValue::Null => Some(false),
            _ => None,
        }
    }

    /// View the value as a list of elements, if it is one.
    #[must_use]
    pub fn elements(&self) -> Option<Vec<Value>> {
        match &self.0 {
            JsonValue::Array(items) => Some(items.iter().cloned().map(Value).collect()),
            _ => None,
        }
    }

    /// Access the inner `serde_json::Value`.
    #[must_use]
    pub fn inner(&self) -> &JsonValue {
        &self.0
    }

    /// Mutably access the inner `serde_json::Value`.
    pub fn inner_mut(&mut self) -> &mut JsonValue {
        &mut self.0
    }

    /// Convert into the inner `serde_json::Value`.
    #[must_use]
    pub fn into_inner(self) -> JsonValue {
        self.0
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::null()
    }
}

impl From<JsonValue> for Value {
    fn from(v: JsonValue) -> Self {
        Self(v)
    }
}

impl From<Value> for JsonValue {
    fn from(v: Value) -> Self {
        v.0
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::string(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::string(s)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::bool(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::array(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn value_nested_field_access() {
        let value = Value(json!({
            "result": {
                "status": "success",
                "data": {
                    "count": 42
                }
            }
        }));

        assert_eq!(
            value.get_field("result.status").and_then(|v| v.as_string()),
            Some("success".to_string())
        );
        assert_eq!(
            value.get_field("result.data.count").and_then(|v| v.as_i64()),
            Some(42)
        );
    }

    #[test]
    fn value_array_access() {
        let value = Value(json!({
            "items": [
                {"name": "first"},
                {"name": "second"}
            ]
        }));

        assert_eq!(
            value.get_field("items[0].name").and_then(|v| v.as_string()),
            Some("first".to_string())
        );
        assert_eq!(
            value.get_field("items[1].name").and_then(|v| v.as_string()),
            Some("second".to_string())
        );
    }

    #[test]
    fn missing_field_returns_none() {
        let value = Value(json!({"a": 1}));
        assert!(value.get_field("missing").is_none());
    }

    #[test]
    fn array_roundtrip() {
        let value = Value::array(vec![Value::int(1), Value::int(2)]);
        let items = value.elements().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_i64(), Some(1));
        assert_eq!(items[1].as_i64(), Some(2));
    }

    #[test]
    fn conversions() {
        assert_eq!(Value::int(3).as_i64(), Some(3));
        assert_eq!(Value::string("3").as_i64(), Some(3));
        assert_eq!(Value::float(0.5).as_f64(), Some(0.5));
        assert_eq!(Value::bool(true).as_bool(), Some(true));
        assert_eq!(Value::null().as_bool(), Some(false));
        assert!(Value::null().is_null());
    }
}
