//! JSON blueprints: a small declarative schema language for JSON documents.
//!
//! A blueprint file declares object types and marks some of them as roots.
//! [`compile`] turns the text into an immutable [`Schema`]; a
//! [`RootDeserializer`] bound to one root then checks raw JSON against it
//! and yields a [`NormalizedValue`] with defaults applied, which
//! [`to_object`] exposes for attribute-style access.
//!
//! ```
//! let schema = json_blueprint::load_str(
//!     "root Parameters { operand1: number, operand2: number }",
//! )?;
//! let params = schema.choose_root("Parameters");
//! let value = params.deserialize(r#"{"operand1": 6, "operand2": 3}"#)?;
//! let payload = json_blueprint::to_object(&value);
//! let q = payload.field("operand1").and_then(|x| x.number()).unwrap_or_default()
//!     / payload.field("operand2").and_then(|x| x.number()).unwrap_or(1.0);
//! assert_eq!(q, 2.0);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
pub mod compiler;
pub mod emit;
pub mod error;
pub mod ir;
pub mod mapper;
pub mod reload;
pub mod source;
pub mod typed;
pub mod validate;
pub mod value;

use std::path::Path;

pub use compiler::{Compiler, compile};
pub use emit::to_json_schema;
pub use error::{
    CompileError, ErrorClass, Kind, Path as ValuePath, PathSegment, UnknownRoot, ValidationError,
    ValidationErrors, Violation,
};
pub use ir::Schema;
pub use mapper::{ObjectGraph, Shape, to_object};
pub use reload::SchemaCell;
pub use source::SchemaSource;
pub use typed::{TypedError, from_normalized};
pub use validate::RootDeserializer;
pub use value::NormalizedValue;

/// Reads and compiles a blueprint file with default options.
pub fn load_file(path: impl AsRef<Path>) -> Result<Schema, CompileError> {
    compile(&SchemaSource::from_file(path)?)
}

/// Compiles blueprint text with default options.
pub fn load_str(text: &str) -> Result<Schema, CompileError> {
    compile(&SchemaSource::from_text("<inline>", text))
}
