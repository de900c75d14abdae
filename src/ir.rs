// Resolved schema graph. Produced by the compiler, read by the validator,
// never mutated in between.
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use ordered_float::OrderedFloat;
use regex::Regex;
use serde_json::Number;

use crate::error::UnknownRoot;
use crate::validate::RootDeserializer;
use crate::value::NormalizedValue;

/// Index of a [`TypeDef`] inside its schema's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub(crate) usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Number,
    Integer,
    String,
    Boolean,
}

impl ScalarKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Number => "number",
            Self::Integer => "integer",
            Self::String => "string",
            Self::Boolean => "boolean",
        }
    }

    pub(crate) fn from_keyword(word: &str) -> Option<Self> {
        match word {
            "number" => Some(Self::Number),
            "integer" => Some(Self::Integer),
            "string" => Some(Self::String),
            "boolean" | "bool" => Some(Self::Boolean),
            _ => None,
        }
    }
}

/// Compiled string pattern; compares by source text.
#[derive(Debug, Clone)]
pub struct Pattern(Regex);

impl Pattern {
    pub(crate) fn new(regex: Regex) -> Self {
        Self(regex)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_match(&self, s: &str) -> bool {
        self.0.is_match(s)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

/// Total order over JSON numbers.
///
/// Integers (anything fitting `i64` or `u64`) compare exactly; only when a
/// side is fractional do both go through `f64`.
pub fn compare_numbers(a: &Number, b: &Number) -> Ordering {
    fn exact(n: &Number) -> Option<i128> {
        n.as_i64().map(i128::from).or_else(|| n.as_u64().map(i128::from))
    }
    match (exact(a), exact(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        _ => {
            let float = |n: &Number| OrderedFloat(n.as_f64().unwrap_or(f64::NAN));
            float(a).cmp(&float(b))
        }
    }
}

/// Narrowing applied after the scalar kind matched.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Constraints {
    /// Numeric bounds keep the literal as written; see [`compare_numbers`].
    pub min: Option<Number>,
    pub max: Option<Number>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub pattern: Option<Pattern>,
}

impl Constraints {
    pub fn is_empty(&self) -> bool {
        self.min.is_none()
            && self.max.is_none()
            && self.min_length.is_none()
            && self.max_length.is_none()
            && self.pattern.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Scalar {
    pub kind: ScalarKind,
    pub constraints: Constraints,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    Scalar(Scalar),
    /// A named object type.
    Ref(TypeId),
    /// An object declared in place; lives in the arena under a synthesized name.
    Inline(TypeId),
    Array(Box<FieldType>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name: String,
    pub ty: FieldType,
    pub required: bool,
    pub default: Option<NormalizedValue>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeDef {
    pub name: String,
    /// Declaration order is kept; lookup is by key.
    pub fields: IndexMap<String, FieldDef>,
    /// Closed objects reject keys without a matching field.
    pub closed: bool,
    /// True for inline objects.
    pub anonymous: bool,
}

impl TypeDef {
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.get(name)
    }
}

#[derive(Debug)]
pub(crate) struct Graph {
    pub(crate) origin: String,
    pub(crate) types: Vec<TypeDef>,
    pub(crate) by_name: HashMap<String, TypeId>,
    pub(crate) roots: IndexMap<String, TypeId>,
}

/// A compiled blueprint.
///
/// Cloning is cheap and every clone sees the same immutable graph, so a
/// `Schema` can be handed to as many threads as needed without locking.
/// Recompiling always yields a new, independent `Schema`.
#[derive(Debug, Clone)]
pub struct Schema {
    graph: Arc<Graph>,
}

impl Schema {
    pub(crate) fn from_graph(graph: Graph) -> Self {
        Self { graph: Arc::new(graph) }
    }

    /// File path or label the blueprint was read from.
    pub fn origin(&self) -> &str {
        &self.graph.origin
    }

    /// Declared roots, in declaration order.
    pub fn root_names(&self) -> impl Iterator<Item = &str> {
        self.graph.roots.keys().map(String::as_str)
    }

    pub fn is_root(&self, name: &str) -> bool {
        self.graph.roots.contains_key(name)
    }

    /// Named (non-inline) types, in declaration order.
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.graph.types.iter().filter(|t| !t.anonymous).map(|t| t.name.as_str())
    }

    pub fn type_count(&self) -> usize {
        self.graph.types.len()
    }

    pub fn get_type(&self, name: &str) -> Option<&TypeDef> {
        self.graph.by_name.get(name).map(|id| self.type_def(*id))
    }

    pub fn root_id(&self, name: &str) -> Option<TypeId> {
        self.graph.roots.get(name).copied()
    }

    pub fn type_def(&self, id: TypeId) -> &TypeDef {
        &self.graph.types[id.0]
    }

    /// True when both handles point at the same compiled graph.
    pub fn same_instance(&self, other: &Schema) -> bool {
        Arc::ptr_eq(&self.graph, &other.graph)
    }

    /// Binds a deserializer to a declared root.
    ///
    /// # Panics
    ///
    /// Panics when `name` was never declared as a root. Asking for an
    /// undeclared root is a programming error, not a property of the
    /// input; use [`Schema::try_choose_root`] when the name comes from
    /// configuration.
    pub fn choose_root(&self, name: &str) -> RootDeserializer {
        match self.try_choose_root(name) {
            Ok(deserializer) => deserializer,
            Err(error) => panic!("{error}"),
        }
    }

    pub fn try_choose_root(&self, name: &str) -> Result<RootDeserializer, UnknownRoot> {
        match self.root_id(name) {
            Some(id) => Ok(RootDeserializer::new(self.clone(), name.to_string(), id)),
            None => Err(UnknownRoot {
                name: name.to_string(),
                origin: self.origin().to_string(),
                declared: self.root_names().map(str::to_string).collect(),
            }),
        }
    }

    pub(crate) fn graph(&self) -> &Graph {
        &self.graph
    }
}

// ————————————————————————————————————————————————————————————————————————————
// DEBUG RENDERING
// ————————————————————————————————————————————————————————————————————————————

/// Renders a field type back in blueprint syntax (inline objects by name).
pub struct DisplayType<'a> {
    schema: &'a Schema,
    ty: &'a FieldType,
}

impl FieldType {
    pub fn display<'a>(&'a self, schema: &'a Schema) -> DisplayType<'a> {
        DisplayType { schema, ty: self }
    }
}

impl fmt::Display for DisplayType<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ty {
            FieldType::Scalar(scalar) => {
                f.write_str(scalar.kind.keyword())?;
                let c = &scalar.constraints;
                if !c.is_empty() {
                    let mut parts = Vec::new();
                    if let Some(min) = &c.min { parts.push(format!("min = {min}")); }
                    if let Some(max) = &c.max { parts.push(format!("max = {max}")); }
                    if let Some(n) = c.min_length { parts.push(format!("min_length = {n}")); }
                    if let Some(n) = c.max_length { parts.push(format!("max_length = {n}")); }
                    if let Some(p) = &c.pattern { parts.push(format!("pattern = {:?}", p.as_str())); }
                    write!(f, "({})", parts.join(", "))?;
                }
                Ok(())
            }
            FieldType::Ref(id) | FieldType::Inline(id) => {
                f.write_str(&self.schema.type_def(*id).name)
            }
            FieldType::Array(item) => write!(f, "{}[]", item.display(self.schema)),
        }
    }
}
