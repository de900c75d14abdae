//! Attribute-style access over a normalized value.
//!
//! [`ObjectGraph`] borrows the tree it views; nothing is copied and nothing
//! is re-validated. It does not know which blueprint certified the value.
use serde_json::Number;

use crate::error::ValidationError;
use crate::validate::RootDeserializer;
use crate::value::NormalizedValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Object,
    Array,
    Scalar,
}

/// Read-only view over one node of a [`NormalizedValue`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectGraph<'a> {
    node: &'a NormalizedValue,
}

/// Wraps a normalized value. Total: every value has a view.
pub fn to_object(value: &NormalizedValue) -> ObjectGraph<'_> {
    ObjectGraph { node: value }
}

impl<'a> ObjectGraph<'a> {
    pub fn shape(&self) -> Shape {
        match self.node {
            NormalizedValue::Object(_) => Shape::Object,
            NormalizedValue::Array(_) => Shape::Array,
            _ => Shape::Scalar,
        }
    }

    /// The node this view points at.
    pub fn value(&self) -> &'a NormalizedValue {
        self.node
    }

    // -- objects --

    /// Named attribute; `None` when absent or when this node is not an object.
    pub fn field(&self, name: &str) -> Option<ObjectGraph<'a>> {
        self.node.get(name).map(to_object)
    }

    pub fn has(&self, name: &str) -> bool {
        self.node.get(name).is_some()
    }

    /// Attributes in the order the blueprint declared them.
    pub fn fields(&self) -> impl Iterator<Item = (&'a str, ObjectGraph<'a>)> + 'a {
        self.node
            .as_object()
            .into_iter()
            .flat_map(|map| map.iter().map(|(k, v)| (k.as_str(), to_object(v))))
    }

    // -- arrays --

    pub fn at(&self, index: usize) -> Option<ObjectGraph<'a>> {
        self.node.get_index(index).map(to_object)
    }

    pub fn elements(&self) -> impl Iterator<Item = ObjectGraph<'a>> + 'a {
        self.node.as_array().into_iter().flat_map(|xs| xs.iter().map(to_object))
    }

    /// Element count for arrays, attribute count for objects, 0 for scalars.
    pub fn len(&self) -> usize {
        match self.node {
            NormalizedValue::Object(map) => map.len(),
            NormalizedValue::Array(xs) => xs.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // -- scalars --

    pub fn number(&self) -> Option<f64> {
        self.node.as_f64()
    }

    pub fn integer(&self) -> Option<i64> {
        self.node.as_i64()
    }

    pub fn raw_number(&self) -> Option<&'a Number> {
        self.node.as_number()
    }

    pub fn string(&self) -> Option<&'a str> {
        self.node.as_str()
    }

    pub fn boolean(&self) -> Option<bool> {
        self.node.as_bool()
    }

    pub fn is_null(&self) -> bool {
        self.node.is_null()
    }
}

impl RootDeserializer {
    /// Validates `raw` and hands the accepted payload to `handler`.
    ///
    /// The shape request handlers want: rejection short-circuits with the
    /// validation error, acceptance runs business logic on the view.
    pub fn handle<T>(
        &self,
        raw: impl AsRef<[u8]>,
        handler: impl FnOnce(ObjectGraph<'_>) -> T,
    ) -> Result<T, ValidationError> {
        let value = self.deserialize(raw)?;
        Ok(handler(to_object(&value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SchemaSource, compile};

    #[test]
    fn attribute_access_over_a_validated_value() {
        let schema = compile(&SchemaSource::from_text(
            "inline",
            "type Point { x: number, y: number }\nroot Parameters { operand1: number, operand2: number, at: Point, path: Point[] }",
        ))
        .unwrap();
        let value = schema
            .choose_root("Parameters")
            .deserialize(r#"{"operand1": 6, "operand2": 3, "at": {"x": 1, "y": 2}, "path": [{"x": 0.5, "y": 0}]}"#)
            .unwrap();

        let payload = to_object(&value);
        assert_eq!(payload.shape(), Shape::Object);
        let quotient = payload.field("operand1").unwrap().number().unwrap()
            / payload.field("operand2").unwrap().number().unwrap();
        assert_eq!(quotient, 2.0);

        assert_eq!(payload.field("at").unwrap().field("y").unwrap().integer(), Some(2));
        let path = payload.field("path").unwrap();
        assert_eq!(path.shape(), Shape::Array);
        assert_eq!(path.len(), 1);
        assert_eq!(path.at(0).unwrap().field("x").unwrap().number(), Some(0.5));
        assert!(path.at(1).is_none());

        let names: Vec<_> = payload.fields().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["operand1", "operand2", "at", "path"]);
    }

    #[test]
    fn handler_runs_only_on_accepted_payloads() {
        let params = compile(&SchemaSource::from_text(
            "inline",
            "root Parameters { operand1: number, operand2: number }",
        ))
        .unwrap()
        .choose_root("Parameters");
        let multiply = |p: ObjectGraph<'_>| {
            p.field("operand1").and_then(|x| x.number()).unwrap_or_default()
                * p.field("operand2").and_then(|x| x.number()).unwrap_or_default()
        };
        assert_eq!(params.handle(r#"{"operand1": 3, "operand2": 4}"#, multiply).unwrap(), 12.0);
        let err = params.handle(r#"{"operand1": 3}"#, multiply).unwrap_err();
        assert_eq!(err.to_string(), "operand2: missing required field");
    }

    #[test]
    fn views_borrow_without_copying() {
        let value = NormalizedValue::Array(vec![NormalizedValue::String("a".into())]);
        let graph = to_object(&value);
        let first = graph.elements().next().unwrap();
        assert!(std::ptr::eq(first.value(), &value.as_array().unwrap()[0]));
        assert_eq!(first.string(), Some("a"));
        assert_eq!(first.shape(), Shape::Scalar);
        assert!(first.field("x").is_none());
        assert_eq!(first.len(), 0);
    }
}
