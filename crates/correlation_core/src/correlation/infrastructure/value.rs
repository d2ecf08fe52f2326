//! Dynamic values carried as request metadata.
//!
//! [`DynamicValue`] is a closed tagged union mirroring `google.protobuf.Value`.
//! It lets callers attach arbitrary key/value data to a transaction without the
//! resolver needing to know its shape.
use std::collections::BTreeMap;

/// Transport-safe representation of an arbitrary metadata value.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum DynamicValue {
    #[default]
    Null,
    Bool(bool),
    /// All numbers travel as double precision floats.
    Number(f64),
    String(String),
    List(Vec<DynamicValue>),
    Map(BTreeMap<String, DynamicValue>),
}

impl DynamicValue {
    /// Tag name, used as a structured logging field.
    pub fn kind(&self) -> &'static str {
        match self {
            DynamicValue::Null => "null",
            DynamicValue::Bool(_) => "bool",
            DynamicValue::Number(_) => "number",
            DynamicValue::String(_) => "string",
            DynamicValue::List(_) => "list",
            DynamicValue::Map(_) => "map",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, DynamicValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            DynamicValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, DynamicValue>> {
        match self {
            DynamicValue::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[DynamicValue]> {
        match self {
            DynamicValue::List(list) => Some(list),
            _ => None,
        }
    }
}

impl From<serde_json::Value> for DynamicValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => DynamicValue::Null,
            serde_json::Value::Bool(b) => DynamicValue::Bool(b),
            // Every JSON number has an f64 approximation
            serde_json::Value::Number(n) => DynamicValue::Number(n.as_f64().unwrap_or_default()),
            serde_json::Value::String(s) => DynamicValue::String(s),
            serde_json::Value::Array(items) => {
                DynamicValue::List(items.into_iter().map(DynamicValue::from).collect())
            }
            serde_json::Value::Object(fields) => DynamicValue::Map(
                fields.into_iter().map(|(key, value)| (key, DynamicValue::from(value))).collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn unit_dynamic_value_from_json() {
        let value = DynamicValue::from(json!({
            "tags": ["a", 1, true, null],
            "nested": {"rate": 0.5}
        }));
        let map = value.as_map().unwrap();
        assert_eq!(
            map["tags"].as_list().unwrap(),
            &[
                DynamicValue::String("a".to_string()),
                DynamicValue::Number(1.0),
                DynamicValue::Bool(true),
                DynamicValue::Null,
            ]
        );
        assert_eq!(map["nested"].as_map().unwrap()["rate"], DynamicValue::Number(0.5));
    }

    #[test]
    fn unit_dynamic_value_kind() {
        assert_eq!(DynamicValue::default().kind(), "null");
        assert!(DynamicValue::default().is_null());
        assert_eq!(DynamicValue::List(vec![]).kind(), "list");
        assert_eq!(DynamicValue::Map(BTreeMap::new()).kind(), "map");
        assert_eq!(DynamicValue::String("x".to_string()).as_str(), Some("x"));
    }
}
