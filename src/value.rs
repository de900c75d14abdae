//! The validated result tree.
//!
//! A `NormalizedValue` has JSON's shape, but one produced by a
//! [`crate::RootDeserializer`] is certified against the blueprint it came
//! from: required fields are present, kinds match, and closed objects carry
//! no undeclared keys.
use std::fmt;
use std::ops::Index;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Number;

use crate::error::Kind;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum NormalizedValue {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Array(Vec<NormalizedValue>),
    Object(IndexMap<String, NormalizedValue>),
}

static NULL: NormalizedValue = NormalizedValue::Null;

impl NormalizedValue {
    pub fn kind(&self) -> Kind {
        match self {
            Self::Null => Kind::Null,
            Self::Bool(_) => Kind::Boolean,
            Self::Number(_) => Kind::Number,
            Self::String(_) => Kind::String,
            Self::Array(_) => Kind::Array,
            Self::Object(_) => Kind::Object,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<&Number> {
        match self {
            Self::Number(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.as_number().and_then(Number::as_f64)
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_number().and_then(Number::as_i64)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[NormalizedValue]> {
        match self {
            Self::Array(xs) => Some(xs),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&IndexMap<String, NormalizedValue>> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Field lookup; `None` on non-objects and absent keys.
    pub fn get(&self, key: &str) -> Option<&NormalizedValue> {
        self.as_object().and_then(|map| map.get(key))
    }

    /// Element lookup; `None` on non-arrays and out-of-range indices.
    pub fn get_index(&self, index: usize) -> Option<&NormalizedValue> {
        self.as_array().and_then(|xs| xs.get(index))
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::from(self.clone())
    }

    /// Converts a JSON scalar without consulting any schema.
    /// Containers are converted recursively.
    pub(crate) fn from_json(value: &serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => Self::Number(n.clone()),
            Value::String(s) => Self::String(s.clone()),
            Value::Array(xs) => Self::Array(xs.iter().map(Self::from_json).collect()),
            Value::Object(map) => Self::Object(
                map.iter().map(|(k, v)| (k.clone(), Self::from_json(v))).collect(),
            ),
        }
    }
}

impl From<NormalizedValue> for serde_json::Value {
    fn from(value: NormalizedValue) -> Self {
        match value {
            NormalizedValue::Null => Self::Null,
            NormalizedValue::Bool(b) => Self::Bool(b),
            NormalizedValue::Number(n) => Self::Number(n),
            NormalizedValue::String(s) => Self::String(s),
            NormalizedValue::Array(xs) => Self::Array(xs.into_iter().map(Self::from).collect()),
            NormalizedValue::Object(map) => Self::Object(
                map.into_iter().map(|(k, v)| (k, Self::from(v))).collect(),
            ),
        }
    }
}

impl Index<&str> for NormalizedValue {
    type Output = NormalizedValue;

    /// Like `serde_json::Value`, misses yield `Null` instead of panicking.
    fn index(&self, key: &str) -> &Self::Output {
        self.get(key).unwrap_or(&NULL)
    }
}

impl Index<usize> for NormalizedValue {
    type Output = NormalizedValue;

    fn index(&self, index: usize) -> &Self::Output {
        self.get_index(index).unwrap_or(&NULL)
    }
}

impl fmt::Display for NormalizedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.to_json(), f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> NormalizedValue {
        NormalizedValue::from_json(&json!({
            "operand1": 3,
            "operand2": 4.5,
            "tags": ["a", "b"],
            "meta": { "ok": true }
        }))
    }

    #[test]
    fn index_mirrors_json_value_semantics() {
        let v = sample();
        assert_eq!(v["operand1"].as_i64(), Some(3));
        assert_eq!(v["operand2"].as_f64(), Some(4.5));
        assert_eq!(v["tags"][1].as_str(), Some("b"));
        assert_eq!(v["meta"]["ok"].as_bool(), Some(true));
        assert!(v["missing"].is_null());
        assert!(v["tags"][9].is_null());
    }

    #[test]
    fn serializes_back_to_the_same_json() {
        let json = json!({"a": [1, 2.5, "x", null, false], "b": {}});
        let v = NormalizedValue::from_json(&json);
        assert_eq!(serde_json::to_value(&v).unwrap(), json);
        assert_eq!(v.to_json(), json);
        assert_eq!(v.to_string(), json.to_string());
    }

    #[test]
    fn kinds() {
        let v = sample();
        assert_eq!(v.kind(), Kind::Object);
        assert_eq!(v["tags"].kind(), Kind::Array);
        assert_eq!(v["operand1"].kind(), Kind::Number);
    }
}
