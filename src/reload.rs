use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::compiler::Compiler;
use crate::error::{CompileError, UnknownRoot};
use crate::ir::Schema;
use crate::source::SchemaSource;
use crate::validate::RootDeserializer;

/// Shared slot holding the current [`Schema`].
///
/// Readers take a snapshot with [`SchemaCell::current`] and keep using it
/// for as long as they like; swapping in a new schema never disturbs a
/// snapshot already handed out. A failed reload leaves the slot untouched.
#[derive(Debug)]
pub struct SchemaCell {
    current: ArcSwap<Schema>,
    path: Option<PathBuf>,
    compiler: Compiler,
}

impl SchemaCell {
    pub fn new(schema: Schema) -> Self {
        Self { current: ArcSwap::from_pointee(schema), path: None, compiler: Compiler::new() }
    }

    /// Compiles `path` and remembers it for [`SchemaCell::reload`].
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self, CompileError> {
        Self::load_file_with(path, Compiler::new())
    }

    /// Like [`SchemaCell::load_file`]; `compiler` is reused on every reload.
    pub fn load_file_with(path: impl AsRef<Path>, compiler: Compiler) -> Result<Self, CompileError> {
        let path = path.as_ref().to_path_buf();
        let schema = compiler.compile(&SchemaSource::from_file(&path)?)?;
        Ok(Self { current: ArcSwap::from_pointee(schema), path: Some(path), compiler })
    }

    pub fn current(&self) -> Arc<Schema> {
        self.current.load_full()
    }

    /// Binds a root of the current snapshot.
    pub fn choose_root(&self, name: &str) -> Result<RootDeserializer, UnknownRoot> {
        self.current.load().try_choose_root(name)
    }

    /// Installs `schema`, returning the one it displaced.
    pub fn replace(&self, schema: Schema) -> Arc<Schema> {
        self.current.swap(Arc::new(schema))
    }

    /// Recompiles the file this cell was loaded from.
    ///
    /// Returns `Ok(false)` when the cell has no backing file.
    pub fn reload(&self) -> Result<bool, CompileError> {
        let Some(path) = &self.path else {
            return Ok(false);
        };
        let compiled = SchemaSource::from_file(path).and_then(|source| self.compiler.compile(&source));
        match compiled {
            Ok(schema) => {
                tracing::info!(path = %path.display(), roots = ?schema.root_names().collect::<Vec<_>>(), "reloaded blueprint");
                self.current.store(Arc::new(schema));
                Ok(true)
            }
            Err(error) => {
                tracing::warn!(path = %path.display(), %error, "reload failed; keeping previous blueprint");
                Err(error)
            }
        }
    }
}
