use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::error::ValidationError;
use crate::validate::RootDeserializer;
use crate::value::NormalizedValue;

/// Failure to obtain a caller's Rust type from a document.
#[derive(Error, Debug)]
pub enum TypedError {
    /// The document does not satisfy the blueprint.
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    /// The document satisfies the blueprint but not the Rust type.
    #[error("at JSON path {path} → {message}")]
    Shape { path: String, message: String },
}

/// Deserialize a certified value into `T`, with JSON-path context in errors.
pub fn from_normalized<T: DeserializeOwned>(value: &NormalizedValue) -> Result<T, TypedError> {
    match serde_path_to_error::deserialize::<_, T>(value.to_json()) {
        Ok(v) => Ok(v),
        Err(err) => {
            let path = err.path().to_string();
            Err(TypedError::Shape { path, message: err.into_inner().to_string() })
        }
    }
}

impl RootDeserializer {
    /// Validate against the blueprint, then build `T` from the normalized value.
    pub fn deserialize_as<T: DeserializeOwned>(&self, raw: impl AsRef<[u8]>) -> Result<T, TypedError> {
        let value = self.deserialize(raw)?;
        from_normalized(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SchemaSource, compile};
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Parameters {
        operand1: f64,
        operand2: f64,
    }

    #[derive(Debug, Deserialize)]
    #[allow(dead_code)]
    struct Wrong {
        operand1: String,
    }

    fn params() -> RootDeserializer {
        compile(&SchemaSource::from_text(
            "inline",
            "root Parameters { operand1: number, operand2: number }",
        ))
        .unwrap()
        .choose_root("Parameters")
    }

    #[test]
    fn builds_rust_types_from_valid_documents() {
        let p: Parameters = params().deserialize_as(r#"{"operand1": 7, "operand2": 2.5}"#).unwrap();
        assert_eq!(p, Parameters { operand1: 7.0, operand2: 2.5 });
    }

    #[test]
    fn blueprint_violations_come_first() {
        let err = params().deserialize_as::<Parameters>(r#"{"operand1": 7}"#).unwrap_err();
        assert!(matches!(err, TypedError::Invalid(ref e) if e.path().to_strings() == ["operand2"]));
    }

    #[test]
    fn rust_shape_mismatch_reports_the_path() {
        let err = params().deserialize_as::<Wrong>(r#"{"operand1": 7, "operand2": 1}"#).unwrap_err();
        match err {
            TypedError::Shape { path, .. } => assert_eq!(path, "operand1"),
            other => panic!("unexpected {other}"),
        }
    }
}
