// JSON Schema (draft 2020-12) rendering of a compiled blueprint.
use serde_json::{Map, Value, json};

use crate::error::UnknownRoot;
use crate::ir::{FieldType, Scalar, ScalarKind, Schema, TypeDef, TypeId};

pub const DRAFT: &str = "https://json-schema.org/draft/2020-12/schema";

/// Emits a standalone JSON Schema for `root`.
///
/// Named types reachable from the root land in `$defs` and are referenced
/// with `$ref`; inline objects are expanded in place.
pub fn to_json_schema(schema: &Schema, root: &str) -> Result<Value, UnknownRoot> {
    let id = schema.root_id(root).ok_or_else(|| unknown_root(schema, root))?;

    let mut defs = Map::new();
    for ty in reachable_types(schema, id) {
        let def = schema.type_def(ty);
        if !def.anonymous {
            defs.insert(def.name.clone(), emit_object(schema, def));
        }
    }

    Ok(json!({
        "$schema": DRAFT,
        "title": root,
        "$ref": def_ref(&schema.type_def(id).name),
        "$defs": defs,
    }))
}

fn unknown_root(schema: &Schema, root: &str) -> UnknownRoot {
    UnknownRoot {
        name: root.to_string(),
        origin: schema.origin().to_string(),
        declared: schema.root_names().map(str::to_string).collect(),
    }
}

fn def_ref(name: &str) -> String {
    format!("#/$defs/{name}")
}

fn emit_object(schema: &Schema, def: &TypeDef) -> Value {
    let mut props = Map::new();
    let mut required: Vec<Value> = Vec::new();
    for (key, field) in &def.fields {
        let mut o = emit_type(schema, &field.ty);
        if let (Some(default), Value::Object(map)) = (&field.default, &mut o) {
            map.insert("default".into(), default.to_json());
        }
        props.insert(key.clone(), o);
        if field.required {
            required.push(Value::from(key.clone()));
        }
    }
    let mut o = json!({ "type": "object", "properties": props });
    if !required.is_empty() {
        o["required"] = Value::Array(required);
    }
    if def.closed {
        o["additionalProperties"] = Value::Bool(false);
    }
    o
}

fn emit_type(schema: &Schema, ty: &FieldType) -> Value {
    match ty {
        FieldType::Scalar(scalar) => emit_scalar(scalar),
        FieldType::Ref(id) => json!({ "$ref": def_ref(&schema.type_def(*id).name) }),
        FieldType::Inline(id) => emit_object(schema, schema.type_def(*id)),
        FieldType::Array(item) => json!({ "type": "array", "items": emit_type(schema, item) }),
    }
}

fn emit_scalar(scalar: &Scalar) -> Value {
    let mut o = json!({ "type": scalar.kind.keyword() });
    let c = &scalar.constraints;
    match scalar.kind {
        ScalarKind::Number | ScalarKind::Integer => {
            if let Some(min) = &c.min {
                o["minimum"] = Value::Number(min.clone());
            }
            if let Some(max) = &c.max {
                o["maximum"] = Value::Number(max.clone());
            }
        }
        ScalarKind::String => {
            if let Some(n) = c.min_length {
                o["minLength"] = Value::from(n);
            }
            if let Some(n) = c.max_length {
                o["maxLength"] = Value::from(n);
            }
            if let Some(p) = &c.pattern {
                o["pattern"] = Value::from(p.as_str());
            }
        }
        ScalarKind::Boolean => {}
    }
    o
}

/// Ids of every type reachable from `root`, in first-visit order.
pub fn reachable_types(schema: &Schema, root: TypeId) -> Vec<TypeId> {
    fn visit(schema: &Schema, ty: &FieldType, seen: &mut Vec<TypeId>) {
        match ty {
            FieldType::Scalar(_) => {}
            FieldType::Ref(id) | FieldType::Inline(id) => walk(schema, *id, seen),
            FieldType::Array(item) => visit(schema, item, seen),
        }
    }
    fn walk(schema: &Schema, id: TypeId, seen: &mut Vec<TypeId>) {
        if seen.contains(&id) {
            return;
        }
        seen.push(id);
        for field in schema.type_def(id).fields.values() {
            visit(schema, &field.ty, seen);
        }
    }
    let mut seen = Vec::new();
    walk(schema, root, &mut seen);
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SchemaSource, compile};
    use pretty_assertions::assert_eq;

    fn schema(text: &str) -> Schema {
        compile(&SchemaSource::from_text("emit.jbp", text)).unwrap()
    }

    #[test]
    fn closed_root_with_required_fields() {
        let s = schema("root Parameters { operand1: number, operand2: number(min = 0.5) }");
        let out = to_json_schema(&s, "Parameters").unwrap();
        assert_eq!(
            out,
            json!({
                "$schema": DRAFT,
                "title": "Parameters",
                "$ref": "#/$defs/Parameters",
                "$defs": {
                    "Parameters": {
                        "type": "object",
                        "properties": {
                            "operand1": { "type": "number" },
                            "operand2": { "type": "number", "minimum": 0.5 }
                        },
                        "required": ["operand1", "operand2"],
                        "additionalProperties": false
                    }
                }
            })
        );
    }

    #[test]
    fn refs_inline_objects_arrays_and_defaults() {
        let s = schema(
            r#"open type Tag { name: string(min_length = 1, pattern = "^[a-z]+$") }
               root Doc {
                   tags: Tag[]
                   meta: open { optional count: integer(max = 10) = 3 }
               }"#,
        );
        let out = to_json_schema(&s, "Doc").unwrap();
        let doc = &out["$defs"]["Doc"];
        assert_eq!(doc["properties"]["tags"], json!({ "type": "array", "items": { "$ref": "#/$defs/Tag" } }));
        assert_eq!(
            doc["properties"]["meta"],
            json!({
                "type": "object",
                "properties": { "count": { "type": "integer", "maximum": 10, "default": 3 } }
            })
        );
        let tag = &out["$defs"]["Tag"];
        assert!(tag.get("additionalProperties").is_none());
        assert_eq!(tag["properties"]["name"]["minLength"], json!(1));
        assert_eq!(tag["properties"]["name"]["pattern"], json!("^[a-z]+$"));
        // inline objects never get their own $defs entry
        assert_eq!(out["$defs"].as_object().unwrap().len(), 2);
    }

    #[test]
    fn unknown_root_is_an_error() {
        let s = schema("type A { x: number }");
        let err = to_json_schema(&s, "A").unwrap_err();
        assert_eq!(err.name, "A");
        assert!(err.declared.is_empty());
    }

    #[test]
    fn reachability_follows_refs_without_looping() {
        let s = schema("type Node { next: Node[], label: string }\ntype Unused { x: number }\nroot List { head: Node }");
        let ids = reachable_types(&s, s.root_id("List").unwrap());
        let names: Vec<_> = ids.iter().map(|id| s.type_def(*id).name.as_str()).collect();
        assert_eq!(names, vec!["List", "Node"]);
    }
}
