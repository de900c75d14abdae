//! Validating deserialization.
//!
//! A [`RootDeserializer`] binds a compiled schema to one of its roots and
//! turns raw JSON into a [`NormalizedValue`] in a single depth-first,
//! left-to-right walk. Declared fields are visited in declaration order,
//! then undeclared input keys in document order.
//!
//! The default walk is fail-fast: the first violation ends it. The
//! accumulating variant ([`RootDeserializer::deserialize_all`]) keeps going
//! and reports every violation in the same order, so its first error is
//! always the fail-fast error.
use indexmap::IndexMap;
use serde_json::Value;

use crate::error::{Kind, Path, PathSegment, ValidationError, ValidationErrors, Violation};
use crate::ir::{FieldType, Scalar, ScalarKind, Schema, TypeId, compare_numbers};
use crate::value::NormalizedValue;

/// A schema bound to one declared root. Cheap to clone, `Send + Sync`.
#[derive(Debug, Clone)]
pub struct RootDeserializer {
    schema: Schema,
    root_name: String,
    root: TypeId,
}

impl RootDeserializer {
    pub(crate) fn new(schema: Schema, root_name: String, root: TypeId) -> Self {
        Self { schema, root_name, root }
    }

    pub fn root_name(&self) -> &str {
        &self.root_name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Parses and validates raw JSON bytes (UTF-8).
    pub fn deserialize(&self, raw: impl AsRef<[u8]>) -> Result<NormalizedValue, ValidationError> {
        let value = parse(raw.as_ref())?;
        self.deserialize_value(&value)
    }

    pub fn deserialize_str(&self, raw: &str) -> Result<NormalizedValue, ValidationError> {
        self.deserialize(raw.as_bytes())
    }

    /// Validates an already parsed document.
    pub fn deserialize_value(&self, value: &Value) -> Result<NormalizedValue, ValidationError> {
        self.run(value, Mode::FailFast).map_err(|errors| {
            let first = errors.first().clone();
            tracing::trace!(root = %self.root_name, error = %first, "document rejected");
            first
        })
    }

    /// Accumulating walk: every violation, in traversal order.
    pub fn deserialize_all(&self, raw: impl AsRef<[u8]>) -> Result<NormalizedValue, ValidationErrors> {
        let value = parse(raw.as_ref()).map_err(|e| ValidationErrors::new(vec![e]))?;
        self.deserialize_value_all(&value)
    }

    pub fn deserialize_value_all(&self, value: &Value) -> Result<NormalizedValue, ValidationErrors> {
        self.run(value, Mode::Collect).inspect_err(|errors| {
            tracing::trace!(root = %self.root_name, count = errors.len(), "document rejected");
        })
    }

    pub fn is_valid(&self, raw: impl AsRef<[u8]>) -> bool {
        self.deserialize(raw).is_ok()
    }

    fn run(&self, value: &Value, mode: Mode) -> Result<NormalizedValue, ValidationErrors> {
        let mut walker = Walker { schema: &self.schema, mode, path: Path::root(), errors: Vec::new() };
        match walker.object(self.root, value) {
            Ok(normalized) => Ok(normalized),
            Err(Stop) => Err(ValidationErrors::new(walker.errors)),
        }
    }
}

fn parse(raw: &[u8]) -> Result<Value, ValidationError> {
    serde_json::from_slice::<Value>(raw).map_err(|e| {
        ValidationError::new(Path::root(), Violation::MalformedInput { reason: e.to_string() })
    })
}

// ------------------------------- Walk ------------------------------------- //

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    FailFast,
    Collect,
}

/// The subtree was rejected; the violation is already recorded.
#[derive(Debug)]
struct Stop;

struct Walker<'s> {
    schema: &'s Schema,
    mode: Mode,
    path: Path,
    errors: Vec<ValidationError>,
}

impl<'s> Walker<'s> {
    fn reject(&mut self, violation: Violation) -> Stop {
        self.errors.push(ValidationError::new(self.path.clone(), violation));
        Stop
    }

    fn reject_at(&mut self, segment: PathSegment, violation: Violation) -> Stop {
        self.path.push(segment);
        let stop = self.reject(violation);
        self.path.pop();
        stop
    }

    fn descend<T>(
        &mut self,
        segment: PathSegment,
        f: impl FnOnce(&mut Self) -> Result<T, Stop>,
    ) -> Result<T, Stop> {
        self.path.push(segment);
        let out = f(self);
        self.path.pop();
        out
    }

    /// Fail-fast propagates; collecting mode notes the failure and moves on.
    fn absorb<T>(&self, result: Result<T, Stop>, failed: &mut bool) -> Result<Option<T>, Stop> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(stop) if self.mode == Mode::FailFast => Err(stop),
            Err(Stop) => {
                *failed = true;
                Ok(None)
            }
        }
    }

    fn walk(&mut self, ty: &'s FieldType, value: &Value) -> Result<NormalizedValue, Stop> {
        match ty {
            FieldType::Scalar(scalar) => check_scalar(scalar, value).map_err(|v| self.reject(v)),
            FieldType::Ref(id) | FieldType::Inline(id) => self.object(*id, value),
            FieldType::Array(item) => self.array(item, value),
        }
    }

    fn object(&mut self, id: TypeId, value: &Value) -> Result<NormalizedValue, Stop> {
        let Value::Object(input) = value else {
            return Err(self.reject(Violation::TypeMismatch { expected: Kind::Object, actual: Kind::of(value) }));
        };
        let schema = self.schema;
        let def = schema.type_def(id);
        let mut out = IndexMap::with_capacity(def.fields.len());
        let mut failed = false;

        for (name, field) in &def.fields {
            match input.get(name) {
                Some(v) => {
                    let result = self.descend(PathSegment::Field(name.clone()), |w| w.walk(&field.ty, v));
                    if let Some(normalized) = self.absorb(result, &mut failed)? {
                        out.insert(name.clone(), normalized);
                    }
                }
                None if field.required => {
                    let stop = self.reject_at(PathSegment::Field(name.clone()), Violation::MissingField);
                    self.absorb::<()>(Err(stop), &mut failed)?;
                }
                None => {
                    if let Some(default) = &field.default {
                        out.insert(name.clone(), default.clone());
                    }
                }
            }
        }

        if def.closed {
            for key in input.keys() {
                if !def.fields.contains_key(key) {
                    let stop = self.reject_at(PathSegment::Field(key.clone()), Violation::UnknownField);
                    self.absorb::<()>(Err(stop), &mut failed)?;
                }
            }
        }

        if failed { Err(Stop) } else { Ok(NormalizedValue::Object(out)) }
    }

    fn array(&mut self, item: &'s FieldType, value: &Value) -> Result<NormalizedValue, Stop> {
        let Value::Array(elements) = value else {
            return Err(self.reject(Violation::TypeMismatch { expected: Kind::Array, actual: Kind::of(value) }));
        };
        let mut out = Vec::with_capacity(elements.len());
        let mut failed = false;
        for (i, element) in elements.iter().enumerate() {
            let result = self.descend(PathSegment::Index(i), |w| w.walk(item, element));
            if let Some(normalized) = self.absorb(result, &mut failed)? {
                out.push(normalized);
            }
        }
        if failed { Err(Stop) } else { Ok(NormalizedValue::Array(out)) }
    }
}

// ------------------------------- Scalars ---------------------------------- //

/// Kind check, then constraints. Shared with the compiler's default checks.
pub(crate) fn check_scalar(scalar: &Scalar, value: &Value) -> Result<NormalizedValue, Violation> {
    let mismatch = |expected| Violation::TypeMismatch { expected, actual: Kind::of(value) };
    let c = &scalar.constraints;
    match (scalar.kind, value) {
        (ScalarKind::Boolean, Value::Bool(b)) => Ok(NormalizedValue::Bool(*b)),
        (ScalarKind::Number | ScalarKind::Integer, Value::Number(n)) => {
            let is_integer = n.is_i64()
                || n.is_u64()
                || n.as_f64().is_some_and(|f| f.is_finite() && f.fract() == 0.0);
            if scalar.kind == ScalarKind::Integer && !is_integer {
                return Err(mismatch(Kind::Integer));
            }
            if let Some(min) = c.min.as_ref().filter(|min| compare_numbers(n, min).is_lt()) {
                return Err(Violation::Constraint { reason: format!("{n} is less than the minimum {min}") });
            }
            if let Some(max) = c.max.as_ref().filter(|max| compare_numbers(n, max).is_gt()) {
                return Err(Violation::Constraint { reason: format!("{n} is greater than the maximum {max}") });
            }
            Ok(NormalizedValue::Number(n.clone()))
        }
        (ScalarKind::String, Value::String(s)) => {
            let len = s.chars().count();
            if let Some(min) = c.min_length.filter(|min| len < *min) {
                return Err(Violation::Constraint {
                    reason: format!("length {len} is shorter than the minimum {min}"),
                });
            }
            if let Some(max) = c.max_length.filter(|max| len > *max) {
                return Err(Violation::Constraint {
                    reason: format!("length {len} is longer than the maximum {max}"),
                });
            }
            if let Some(pattern) = c.pattern.as_ref().filter(|p| !p.is_match(s)) {
                return Err(Violation::Constraint {
                    reason: format!("{s:?} does not match pattern {:?}", pattern.as_str()),
                });
            }
            Ok(NormalizedValue::String(s.clone()))
        }
        (ScalarKind::Boolean, _) => Err(mismatch(Kind::Boolean)),
        (ScalarKind::Number, _) => Err(mismatch(Kind::Number)),
        (ScalarKind::Integer, _) => Err(mismatch(Kind::Integer)),
        (ScalarKind::String, _) => Err(mismatch(Kind::String)),
    }
}

// ------------------------------- Tests ------------------------------------ //
