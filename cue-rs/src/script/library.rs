//! Named script sources with a compile-once cache.
//!
//! A map or level imports the cutscene sources it owns by name; the first
//! time a script is needed it is compiled, and every later instance shares
//! the same [`Block`].

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;

use log::debug;
use thiserror::Error;

use super::ast::Block;
use super::error::ParseError;
use super::eval::Script;
use super::parser::parse_block;

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("unknown script `{0}`")]
    Unknown(String),
    #[error("script `{name}`: {source}")]
    Parse {
        name: String,
        #[source]
        source: ParseError,
    },
}

#[derive(Debug, Default)]
pub struct ScriptLibrary {
    sources: HashMap<String, String>,
    compiled: HashMap<String, Arc<Block>>,
}

impl ScriptLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a script source under `name`.
    pub fn import(&mut self, name: impl Into<String>, source: impl Into<String>) {
        let name = name.into();
        self.compiled.remove(&name);
        self.sources.insert(name, source.into());
    }

    /// Import a file under its stem (`scenes/intro.cue` → `intro`).
    /// Returns the name used.
    pub fn import_file(&mut self, path: &Path) -> io::Result<String> {
        let source = fs::read_to_string(path)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.import(name.clone(), source);
        Ok(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sources.contains_key(name)
    }

    pub fn is_compiled(&self, name: &str) -> bool {
        self.compiled.contains_key(name)
    }

    /// The compiled block for `name`, compiling on first use.
    pub fn compile(&mut self, name: &str) -> Result<Arc<Block>, LibraryError> {
        if let Some(block) = self.compiled.get(name) {
            return Ok(Arc::clone(block));
        }
        let source = self
            .sources
            .get(name)
            .ok_or_else(|| LibraryError::Unknown(name.to_owned()))?;
        let block = Arc::new(
            parse_block(source)
                .map_err(|source| LibraryError::Parse { name: name.to_owned(), source })?,
        );
        debug!("compiled `{name}`: {} statement(s)", block.len());
        self.compiled.insert(name.to_owned(), Arc::clone(&block));
        Ok(block)
    }

    /// A fresh runnable instance of `name`.
    pub fn instantiate(&mut self, name: &str) -> Result<Script, LibraryError> {
        self.compile(name).map(Script::new)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
