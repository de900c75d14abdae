//! Error types for the three failure channels:
//! blueprint compilation, per-document validation, and root misuse.
use std::fmt;
use thiserror::Error;

// ————————————————————————————————————————————————————————————————————————————
// COMPILE ERRORS
// ————————————————————————————————————————————————————————————————————————————

/// 1-based line/column inside a blueprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclarationKind {
    Type,
    Field,
    Root,
}

impl fmt::Display for DeclarationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Type => "type",
            Self::Field => "field",
            Self::Root => "root",
        })
    }
}

/// A blueprint that cannot become a [`crate::Schema`].
#[derive(Error, Debug)]
pub enum CompileError {
    #[error("cannot read blueprint '{origin}': {source}")]
    Read {
        origin: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{origin}:{at}: syntax error: {message}")]
    Syntax {
        origin: String,
        at: Location,
        message: String,
    },

    #[error("{origin}:{at}: unresolved type reference `{name}`")]
    UnresolvedReference {
        origin: String,
        name: String,
        at: Location,
    },

    #[error("{origin}:{at}: duplicate {kind} declaration `{name}`")]
    DuplicateDeclaration {
        origin: String,
        kind: DeclarationKind,
        name: String,
        at: Location,
    },

    #[error("{origin}:{at}: invalid default for field `{field}`: {reason}")]
    InvalidDefault {
        origin: String,
        field: String,
        reason: String,
        at: Location,
    },

    #[error("{origin}:{at}: invalid constraint: {reason}")]
    InvalidConstraint {
        origin: String,
        reason: String,
        at: Location,
    },
}

impl CompileError {
    /// Position of the offending token, when the error has one.
    pub fn location(&self) -> Option<Location> {
        match self {
            Self::Read { .. } => None,
            Self::Syntax { at, .. }
            | Self::UnresolvedReference { at, .. }
            | Self::DuplicateDeclaration { at, .. }
            | Self::InvalidDefault { at, .. }
            | Self::InvalidConstraint { at, .. } => Some(*at),
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// VALIDATION ERRORS
// ————————————————————————————————————————————————————————————————————————————

/// JSON value kinds, plus `Integer` which only ever shows up as an expectation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Null,
    Boolean,
    Number,
    Integer,
    String,
    Array,
    Object,
}

impl Kind {
    pub fn of(value: &serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => Self::Null,
            Value::Bool(_) => Self::Boolean,
            Value::Number(_) => Self::Number,
            Value::String(_) => Self::String,
            Value::Array(_) => Self::Array,
            Value::Object(_) => Self::Object,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean => "boolean",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::String => "string",
            Self::Array => "array",
            Self::Object => "object",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Field(String),
    Index(usize),
}

impl PathSegment {
    pub fn field(name: impl Into<String>) -> Self {
        Self::Field(name.into())
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(name) => f.write_str(name),
            Self::Index(i) => write!(f, "{i}"),
        }
    }
}

/// Location of a value inside a JSON document, from the document root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Path(Vec<PathSegment>);

impl Path {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<&PathSegment> {
        self.0.last()
    }

    /// Segments rendered one by one; indices become their decimal form.
    pub fn to_strings(&self) -> Vec<String> {
        self.0.iter().map(ToString::to_string).collect()
    }

    pub(crate) fn push(&mut self, segment: PathSegment) {
        self.0.push(segment);
    }

    pub(crate) fn pop(&mut self) {
        self.0.pop();
    }
}

impl From<Vec<PathSegment>> for Path {
    fn from(segments: Vec<PathSegment>) -> Self {
        Self(segments)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("(root)");
        }
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                PathSegment::Field(name) if !is_identifier(name) => {
                    write!(f, "[{}]", serde_json::Value::from(name.as_str()))?
                }
                PathSegment::Field(name) if i == 0 => f.write_str(name)?,
                PathSegment::Field(name) => write!(f, ".{name}")?,
                PathSegment::Index(idx) => write!(f, "[{idx}]")?,
            }
        }
        Ok(())
    }
}

/// Keys that can be written bare after a `.`; anything else is quoted.
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// What went wrong at a path.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Violation {
    #[error("malformed JSON input: {reason}")]
    MalformedInput { reason: String },

    #[error("missing required field")]
    MissingField,

    #[error("expected {expected}, found {actual}")]
    TypeMismatch { expected: Kind, actual: Kind },

    #[error("unknown field")]
    UnknownField,

    #[error("{reason}")]
    Constraint { reason: String },
}

/// Coarse classification of a [`Violation`], stable across message wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    MalformedInput,
    MissingRequiredField,
    TypeMismatch,
    UnknownField,
    ConstraintViolation,
}

impl ErrorClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MalformedInput => "malformed-input",
            Self::MissingRequiredField => "missing-required-field",
            Self::TypeMismatch => "type-mismatch",
            Self::UnknownField => "unknown-field",
            Self::ConstraintViolation => "constraint-violation",
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Violation {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::MalformedInput { .. } => ErrorClass::MalformedInput,
            Self::MissingField => ErrorClass::MissingRequiredField,
            Self::TypeMismatch { .. } => ErrorClass::TypeMismatch,
            Self::UnknownField => ErrorClass::UnknownField,
            Self::Constraint { .. } => ErrorClass::ConstraintViolation,
        }
    }
}

/// A document rejected by a root deserializer.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{path}: {violation}")]
pub struct ValidationError {
    path: Path,
    violation: Violation,
}

impl ValidationError {
    pub fn new(path: Path, violation: Violation) -> Self {
        Self { path, violation }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn violation(&self) -> &Violation {
        &self.violation
    }

    pub fn class(&self) -> ErrorClass {
        self.violation.class()
    }
}

/// Every violation found by an accumulating walk, in traversal order. Never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationErrors {
    errors: Vec<ValidationError>,
}

impl ValidationErrors {
    pub(crate) fn new(errors: Vec<ValidationError>) -> Self {
        debug_assert!(!errors.is_empty());
        Self { errors }
    }

    /// The violation a fail-fast walk would have stopped at.
    pub fn first(&self) -> &ValidationError {
        &self.errors[0]
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    pub fn into_inner(self) -> Vec<ValidationError> {
        self.errors
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{e}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

// ————————————————————————————————————————————————————————————————————————————
// MISUSE
// ————————————————————————————————————————————————————————————————————————————

/// A root name that the blueprint never declared as a root.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("`{name}` is not a declared root of blueprint '{origin}' (declared roots: {})", .declared.join(", "))]
pub struct UnknownRoot {
    pub name: String,
    pub origin: String,
    pub declared: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_renders_fields_and_indices() {
        let path = Path::from(vec![
            PathSegment::field("items"),
            PathSegment::Index(2),
            PathSegment::field("x"),
        ]);
        assert_eq!(path.to_string(), "items[2].x");
        assert_eq!(path.to_strings(), vec!["items", "2", "x"]);
        assert_eq!(Path::root().to_string(), "(root)");
    }

    #[test]
    fn path_quotes_keys_that_are_not_identifiers() {
        let dotted = Path::from(vec![PathSegment::field("a.b")]);
        let nested = Path::from(vec![PathSegment::field("a"), PathSegment::field("b")]);
        assert_eq!(dotted.to_string(), r#"["a.b"]"#);
        assert_eq!(nested.to_string(), "a.b");
        assert_ne!(dotted.to_string(), nested.to_string());

        let mixed = Path::from(vec![
            PathSegment::field("meta"),
            PathSegment::field("first-name"),
            PathSegment::Index(0),
            PathSegment::field("say \"hi\""),
            PathSegment::field(""),
        ]);
        assert_eq!(mixed.to_string(), r#"meta["first-name"][0]["say \"hi\""][""]"#);
        // raw segments are untouched
        assert_eq!(mixed.to_strings()[1], "first-name");
    }

    #[test]
    fn validation_error_concatenates_path_and_message() {
        let err = ValidationError::new(
            Path::from(vec![PathSegment::field("operand1")]),
            Violation::TypeMismatch { expected: Kind::Number, actual: Kind::String },
        );
        assert_eq!(err.to_string(), "operand1: expected number, found string");
        assert_eq!(err.class(), ErrorClass::TypeMismatch);
    }

    #[test]
    fn unknown_root_lists_declared_roots() {
        let err = UnknownRoot {
            name: "Nope".into(),
            origin: "blueprints.jbp".into(),
            declared: vec!["Parameters".into(), "Point".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("`Nope`"));
        assert!(msg.contains("Parameters, Point"));
    }
}
