use std::path::Path;

use crate::error::CompileError;

/// Raw blueprint text and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaSource {
    origin: String,
    text: String,
}

impl SchemaSource {
    pub fn from_text(origin: impl Into<String>, text: impl Into<String>) -> Self {
        Self { origin: origin.into(), text: text.into() }
    }

    /// Reads a blueprint file. The file is closed before this returns,
    /// whether or not the read succeeded.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CompileError> {
        let path = path.as_ref();
        let origin = path.display().to_string();
        match std::fs::read_to_string(path) {
            Ok(text) => {
                tracing::trace!(%origin, bytes = text.len(), "read blueprint");
                Ok(Self { origin, text })
            }
            Err(source) => Err(CompileError::Read { origin, source }),
        }
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}
