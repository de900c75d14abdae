//! Blueprint compiler.
//!
//! Text goes through three stages:
//! - `lexer`: characters -> tokens (comments and whitespace dropped);
//! - `parser`: tokens -> an unresolved AST of declarations;
//! - resolution (this module): names -> arena ids, constraints and defaults
//!   checked, inline objects given their own arena slots.
//!
//! The result is a [`Schema`] with no name lookups left for validation time.
pub mod lexer;
pub mod parser;

use std::collections::HashMap;

use indexmap::IndexMap;
use regex::Regex;
use serde_json::Number;

use crate::error::{CompileError, DeclarationKind, Location};
use crate::ir::{Constraints, FieldDef, FieldType, Graph, Pattern, Scalar, ScalarKind, Schema, TypeDef, TypeId, compare_numbers};
use crate::source::SchemaSource;
use crate::value::NormalizedValue;
use lexer::Spanned;
use parser::{ConstraintAst, FieldAst, Item, Literal, Openness, TypeAst};

// ------------------------------- Front API -------------------------------- //

/// Compile options. The default rejects undeclared keys in every object
/// that does not say `open`.
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    open_by_default: bool,
}

impl Compiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Objects without an explicit `open`/`closed` modifier drop unknown
    /// keys instead of rejecting them.
    pub fn open_by_default(mut self, open: bool) -> Self {
        self.open_by_default = open;
        self
    }

    pub fn compile(&self, source: &SchemaSource) -> Result<Schema, CompileError> {
        let origin = source.origin();
        let tokens = lexer::tokenize(source.text()).map_err(|e| CompileError::Syntax {
            origin: origin.to_string(),
            at: e.at,
            message: e.message,
        })?;
        let items = parser::parse(tokens).map_err(|e| CompileError::Syntax {
            origin: origin.to_string(),
            at: e.at,
            message: e.message,
        })?;

        let mut resolver = Resolver {
            origin,
            open_by_default: self.open_by_default,
            types: Vec::new(),
            by_name: HashMap::new(),
        };
        let roots = resolver.resolve(&items)?;
        let graph = Graph {
            origin: origin.to_string(),
            types: resolver.types,
            by_name: resolver.by_name,
            roots,
        };
        tracing::debug!(
            origin,
            types = graph.types.len(),
            roots = ?graph.roots.keys().collect::<Vec<_>>(),
            "compiled blueprint"
        );
        Ok(Schema::from_graph(graph))
    }
}

/// Compiles with default options (closed objects).
pub fn compile(source: &SchemaSource) -> Result<Schema, CompileError> {
    Compiler::new().compile(source)
}

// ------------------------------- Resolution ------------------------------- //

struct Resolver<'a> {
    origin: &'a str,
    open_by_default: bool,
    types: Vec<TypeDef>,
    by_name: HashMap<String, TypeId>,
}

impl Resolver<'_> {
    fn resolve(&mut self, items: &[Item]) -> Result<IndexMap<String, TypeId>, CompileError> {
        // 1) reserve a slot per named type so references may point forward
        let mut declared = Vec::new();
        for item in items {
            let Item::Type(decl) = item else { continue };
            let name = &decl.name;
            if ScalarKind::from_keyword(&name.node).is_some() {
                return Err(self.syntax(name.at, format!("`{}` is a reserved type name", name.node)));
            }
            if self.by_name.contains_key(&name.node) {
                return Err(self.duplicate(DeclarationKind::Type, name));
            }
            let id = self.allocate(name.node.clone(), decl.openness, false);
            self.by_name.insert(name.node.clone(), id);
            declared.push((id, decl));
        }

        // 2) fill in fields
        for (id, decl) in declared {
            let fields = self.fields(&decl.name.node, &decl.fields)?;
            self.types[id.0].fields = fields;
        }

        // 3) roots, in source order
        let mut roots = IndexMap::new();
        for item in items {
            let name = match item {
                Item::Type(decl) if decl.root => &decl.name,
                Item::Type(_) => continue,
                Item::RootMark(name) => name,
            };
            let Some(&id) = self.by_name.get(&name.node) else {
                return Err(self.unresolved(name));
            };
            if roots.insert(name.node.clone(), id).is_some() {
                return Err(self.duplicate(DeclarationKind::Root, name));
            }
        }
        Ok(roots)
    }

    fn allocate(&mut self, name: String, openness: Option<Openness>, anonymous: bool) -> TypeId {
        let closed = match openness {
            Some(Openness::Open) => false,
            Some(Openness::Closed) => true,
            None => !self.open_by_default,
        };
        let id = TypeId(self.types.len());
        self.types.push(TypeDef { name, fields: IndexMap::new(), closed, anonymous });
        id
    }

    fn fields(&mut self, owner: &str, asts: &[FieldAst]) -> Result<IndexMap<String, FieldDef>, CompileError> {
        let mut out = IndexMap::with_capacity(asts.len());
        for ast in asts {
            if out.contains_key(&ast.name.node) {
                return Err(self.duplicate(DeclarationKind::Field, &ast.name));
            }
            let ty = self.field_type(owner, &ast.name.node, &ast.ty)?;
            let default = match &ast.default {
                Some(literal) => Some(self.default(&ast.name, &ty, literal)?),
                None => None,
            };
            let required = !ast.optional && default.is_none();
            out.insert(ast.name.node.clone(), FieldDef {
                name: ast.name.node.clone(),
                ty,
                required,
                default,
            });
        }
        Ok(out)
    }

    fn field_type(&mut self, owner: &str, field: &str, ast: &TypeAst) -> Result<FieldType, CompileError> {
        match ast {
            TypeAst::Scalar { kind, constraints } => {
                Ok(FieldType::Scalar(self.scalar(*kind, constraints)?))
            }
            TypeAst::Named(name) => match self.by_name.get(&name.node) {
                Some(id) => Ok(FieldType::Ref(*id)),
                None => Err(self.unresolved(name)),
            },
            TypeAst::Inline { openness, fields } => {
                let name = format!("{owner}.{field}");
                let id = self.allocate(name.clone(), *openness, true);
                let fields = self.fields(&name, fields)?;
                self.types[id.0].fields = fields;
                Ok(FieldType::Inline(id))
            }
            TypeAst::Array(item) => {
                Ok(FieldType::Array(Box::new(self.field_type(owner, field, item)?)))
            }
        }
    }

    fn scalar(&self, kind: ScalarKind, asts: &[ConstraintAst]) -> Result<Scalar, CompileError> {
        let mut c = Constraints::default();
        // where each key was written, for errors that involve two of them
        let mut key_at: HashMap<&str, (usize, Location)> = HashMap::new();
        let numeric = matches!(kind, ScalarKind::Number | ScalarKind::Integer);
        let textual = kind == ScalarKind::String;

        for (ix, ast) in asts.iter().enumerate() {
            let key = ast.key.node.as_str();
            let at = ast.value.at;
            let already = match key {
                "min" if numeric => c.min.replace(self.number(ast)?).is_some(),
                "max" if numeric => c.max.replace(self.number(ast)?).is_some(),
                "min_length" if textual => c.min_length.replace(self.length(ast)?).is_some(),
                "max_length" if textual => c.max_length.replace(self.length(ast)?).is_some(),
                "pattern" if textual => {
                    let Literal::String(src) = &ast.value.node else {
                        return Err(self.constraint(at, "`pattern` expects a string"));
                    };
                    let regex = Regex::new(src)
                        .map_err(|e| self.constraint(at, format!("bad pattern: {e}")))?;
                    c.pattern.replace(Pattern::new(regex)).is_some()
                }
                "min" | "max" | "min_length" | "max_length" | "pattern" => {
                    return Err(self.constraint(
                        ast.key.at,
                        format!("`{key}` does not apply to {}", kind.keyword()),
                    ));
                }
                _ => return Err(self.constraint(ast.key.at, format!("unknown constraint `{key}`"))),
            };
            if already {
                return Err(self.constraint(ast.key.at, format!("`{key}` given twice")));
            }
            key_at.insert(key, (ix, ast.key.at));
        }

        // blame whichever of the pair was written last
        let later = |a: &str, b: &str| match (key_at.get(a), key_at.get(b)) {
            (Some(x), Some(y)) => if x.0 > y.0 { x.1 } else { y.1 },
            (Some(x), None) | (None, Some(x)) => x.1,
            (None, None) => Location::default(),
        };
        if let (Some(min), Some(max)) = (&c.min, &c.max) {
            if compare_numbers(min, max).is_gt() {
                return Err(self.constraint(later("min", "max"), format!("min {min} exceeds max {max}")));
            }
        }
        if let (Some(min), Some(max)) = (c.min_length, c.max_length) {
            if min > max {
                return Err(self.constraint(
                    later("min_length", "max_length"),
                    format!("min_length {min} exceeds max_length {max}"),
                ));
            }
        }
        Ok(Scalar { kind, constraints: c })
    }

    fn number(&self, ast: &ConstraintAst) -> Result<Number, CompileError> {
        match &ast.value.node {
            Literal::Number(n) if n.as_f64().is_some_and(f64::is_finite) => Ok(n.clone()),
            Literal::Number(_) => {
                Err(self.constraint(ast.value.at, format!("`{}` is out of range", ast.key.node)))
            }
            _ => Err(self.constraint(ast.value.at, format!("`{}` expects a number", ast.key.node))),
        }
    }

    fn length(&self, ast: &ConstraintAst) -> Result<usize, CompileError> {
        match &ast.value.node {
            Literal::Number(n) => n
                .as_u64()
                .and_then(|n| usize::try_from(n).ok())
                .ok_or_else(|| {
                    self.constraint(
                        ast.value.at,
                        format!("`{}` expects a non-negative integer", ast.key.node),
                    )
                }),
            _ => Err(self.constraint(
                ast.value.at,
                format!("`{}` expects a non-negative integer", ast.key.node),
            )),
        }
    }

    /// Defaults must satisfy the field's scalar type, constraints included.
    fn default(
        &self,
        field: &Spanned<String>,
        ty: &FieldType,
        literal: &Spanned<Literal>,
    ) -> Result<NormalizedValue, CompileError> {
        let invalid = |reason: String| CompileError::InvalidDefault {
            origin: self.origin.to_string(),
            field: field.node.clone(),
            reason,
            at: literal.at,
        };
        let FieldType::Scalar(scalar) = ty else {
            return Err(invalid("defaults are only supported on scalar fields".into()));
        };
        crate::validate::check_scalar(scalar, &literal.node.to_json())
            .map_err(|violation| invalid(violation.to_string()))
    }

    // -- error helpers --

    fn syntax(&self, at: Location, message: String) -> CompileError {
        CompileError::Syntax { origin: self.origin.to_string(), at, message }
    }

    fn duplicate(&self, kind: DeclarationKind, name: &Spanned<String>) -> CompileError {
        CompileError::DuplicateDeclaration {
            origin: self.origin.to_string(),
            kind,
            name: name.node.clone(),
            at: name.at,
        }
    }

    fn unresolved(&self, name: &Spanned<String>) -> CompileError {
        CompileError::UnresolvedReference {
            origin: self.origin.to_string(),
            name: name.node.clone(),
            at: name.at,
        }
    }

    fn constraint(&self, at: Location, reason: impl Into<String>) -> CompileError {
        CompileError::InvalidConstraint { origin: self.origin.to_string(), reason: reason.into(), at }
    }
}

// ------------------------------- Tests ------------------------------------ //
