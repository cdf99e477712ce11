//! Stylesheet compiler adapter.
//!
//! The [`Compiler`] trait is the only boundary to the preprocessor engine.
//! [`GrassCompiler`] implements it with the [`grass`] crate, a pure Rust
//! port of dart-sass.
//!
//! Compilation is a pure function of the source text: the same input
//! always yields byte-identical output, and nothing is read from disk
//! unless load paths are configured for `@use` / `@import`.

use std::path::PathBuf;

use serde::Deserialize;

use crate::error::CompileError;

/// Compiles stylesheet source into plain CSS.
///
/// Implementations must be deterministic and free of side effects so the
/// resolver can call them any number of times per edit.
pub trait Compiler: Send + Sync {
    fn compile(&self, source: &str) -> Result<String, CompileError>;
}

/// CSS output formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStyle {
    #[default]
    Expanded,
    Compressed,
}

impl From<OutputStyle> for grass::OutputStyle {
    fn from(style: OutputStyle) -> Self {
        match style {
            OutputStyle::Expanded => grass::OutputStyle::Expanded,
            OutputStyle::Compressed => grass::OutputStyle::Compressed,
        }
    }
}

/// Options for [`GrassCompiler`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompilerOptions {
    #[serde(default)]
    pub style: OutputStyle,
    /// Directories searched for `@use` / `@import`. Empty means imports
    /// cannot touch the filesystem at all.
    #[serde(default)]
    pub load_paths: Vec<PathBuf>,
}

/// SCSS compiler backed by `grass`.
#[derive(Debug, Clone, Default)]
pub struct GrassCompiler {
    options: CompilerOptions,
}

impl GrassCompiler {
    pub fn new(options: CompilerOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    fn grass_options(&self) -> grass::Options<'_> {
        let options = grass::Options::default().style(self.options.style.into());
        if self.options.load_paths.is_empty() {
            options.fs(&grass::NullFs)
        } else {
            options.load_paths(&self.options.load_paths)
        }
    }
}

impl Compiler for GrassCompiler {
    fn compile(&self, source: &str) -> Result<String, CompileError> {
        grass::from_string(source, &self.grass_options())
            .map_err(|e| diagnostic_to_error(&e.to_string()))
    }
}

/// Split a grass diagnostic into its message and `line:column` position.
///
/// grass renders errors as `Error: <message>`, a source excerpt, and a
/// trailing locator line holding a `<line>:<column>` token.
fn diagnostic_to_error(diagnostic: &str) -> CompileError {
    let mut lines = diagnostic.lines();
    let message = lines
        .next()
        .map(|l| l.trim().trim_start_matches("Error:").trim().to_string())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| diagnostic.trim().to_string());

    let mut err = CompileError::new(message);
    if let Some((line, column)) = lines.last().and_then(parse_locator) {
        err = err.at(line, column);
    }
    err
}

fn parse_locator(line: &str) -> Option<(usize, usize)> {
    line.split_whitespace().find_map(|token| {
        let (line, column) = token.split_once(':')?;
        Some((line.parse().ok()?, column.parse().ok()?))
    })
}
