//! Error types for stylesheet compilation, mode resolution and storage.

use std::fmt;

use thiserror::Error;

/// The stylesheet compiler rejected its input.
///
/// `message` is the compiler's own diagnostic, passed through verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct CompileError {
    pub message: String,
    pub line: Option<usize>,
    pub column: Option<usize>,
}

impl CompileError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            line: None,
            column: None,
        }
    }

    pub fn at(mut self, line: usize, column: usize) -> Self {
        self.line = Some(line);
        self.column = Some(column);
        self
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.line, self.column) {
            (Some(line), Some(column)) => write!(f, "{} (line {}, column {})", self.message, line, column),
            (Some(line), None) => write!(f, "{} (line {})", self.message, line),
            _ => f.write_str(&self.message),
        }
    }
}

/// A mode choice value outside the accepted set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("illegal CSS preprocessor '{value}': expected one of '', 'none', 'scss', 'preprocessed'")]
    InvalidMode { value: String },
}

/// The persistence backend failed.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read document '{document_id}': {message}")]
    Read { document_id: String, message: String },

    #[error("failed to write document '{document_id}': {message}")]
    Write { document_id: String, message: String },

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn read(document_id: &str, err: impl fmt::Display) -> Self {
        StoreError::Read {
            document_id: document_id.to_string(),
            message: err.to_string(),
        }
    }

    pub fn write(document_id: &str, err: impl fmt::Display) -> Self {
        StoreError::Write {
            document_id: document_id.to_string(),
            message: err.to_string(),
        }
    }
}

/// Failure of a commit (save) attempt. Nothing was persisted.
#[derive(Debug, Error)]
pub enum CommitError {
    #[error("compilation failed: {0}")]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_error_display_includes_position() {
        let err = CompileError::new("expected \"}\".").at(3, 7);
        assert_eq!(err.to_string(), "expected \"}\". (line 3, column 7)");
        assert_eq!(CompileError::new("boom").to_string(), "boom");
    }

    #[test]
    fn test_commit_error_wraps_compile_error_verbatim() {
        let err: CommitError = CompileError::new("expected \";\".").into();
        assert_eq!(err.to_string(), "compilation failed: expected \";\".");
    }
}
