//! Core data models used throughout custom-scss.
//!
//! These types represent the persisted stylesheet documents, the
//! uncommitted draft overlays supplied by an editing session, and the
//! revision history kept alongside each document.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::ConfigurationError;

/// Which language a document's raw source is written in.
///
/// The accepted choice values are fixed: `""` or `"none"` select plain CSS,
/// `"scss"` or `"preprocessed"` select SCSS. Any other value is rejected by
/// [`Mode::parse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Mode {
    /// Plain CSS, stored and served verbatim.
    #[default]
    #[serde(rename = "none")]
    Plain,
    /// SCSS source that must be compiled before it can be served.
    #[serde(rename = "scss")]
    Preprocessed,
}

impl Mode {
    /// Validate a raw choice value.
    pub fn parse(value: &str) -> Result<Mode, ConfigurationError> {
        match value {
            "" | "none" => Ok(Mode::Plain),
            "scss" | "preprocessed" => Ok(Mode::Preprocessed),
            other => Err(ConfigurationError::InvalidMode {
                value: other.to_string(),
            }),
        }
    }

    /// Canonical choice value, as written to mode settings.
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Plain => "none",
            Mode::Preprocessed => "scss",
        }
    }

    pub fn is_preprocessed(&self) -> bool {
        matches!(self, Mode::Preprocessed)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mode::parse(s)
    }
}

/// Persisted stylesheet document.
///
/// Holds both representations of the stylesheet: the source the user
/// wrote and the CSS that is actually served. When `mode` is
/// [`Mode::Plain`] the two are identical.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Store record identifier (UUID), stable across updates.
    pub id: String,
    /// Logical document key, e.g. the stylesheet scope.
    pub document_id: String,
    pub raw_source: String,
    pub compiled_output: String,
    pub mode: Mode,
    pub content_hash: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Uncommitted edits from an active editing session.
///
/// `mode` is the raw choice value as submitted by the editor; it is only
/// validated when the mode is resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftOverlay {
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub raw_source: Option<String>,
}

impl DraftOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = Some(mode.into());
        self
    }

    pub fn with_source(mut self, raw_source: impl Into<String>) -> Self {
        self.raw_source = Some(raw_source.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.mode.is_none() && self.raw_source.is_none()
    }
}

/// A saved revision of a document.
///
/// Both representations are kept so a history view can diff the source
/// and the compiled CSS independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
    pub revision: i64,
    pub document_id: String,
    #[serde(rename = "source")]
    pub raw_source: String,
    #[serde(rename = "css")]
    pub compiled_output: String,
    pub mode: Mode,
    pub content_hash: String,
    pub saved_at: i64,
}

/// Hash of everything a `put` writes, used for revision dedup and ETags.
pub fn content_hash(raw_source: &str, compiled_output: &str, mode: Mode) -> String {
    let mut hasher = Sha256::new();
    hasher.update(mode.as_str().as_bytes());
    hasher.update([0u8]);
    hasher.update(raw_source.as_bytes());
    hasher.update([0u8]);
    hasher.update(compiled_output.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_fixed_choice_set() {
        assert_eq!(Mode::parse("").unwrap(), Mode::Plain);
        assert_eq!(Mode::parse("none").unwrap(), Mode::Plain);
        assert_eq!(Mode::parse("scss").unwrap(), Mode::Preprocessed);
        assert_eq!(Mode::parse("preprocessed").unwrap(), Mode::Preprocessed);
    }

    #[test]
    fn test_parse_rejects_unknown_values() {
        let err = Mode::parse("less").unwrap_err();
        assert_eq!(
            err.to_string(),
            "illegal CSS preprocessor 'less': expected one of '', 'none', 'scss', 'preprocessed'"
        );
        assert!(Mode::parse("SCSS").is_err());
    }

    #[test]
    fn test_parse_does_not_trim_whitespace() {
        for value in [" scss ", "scss\n", " ", "\tnone"] {
            let err = Mode::parse(value).unwrap_err();
            assert_eq!(
                err,
                ConfigurationError::InvalidMode {
                    value: value.to_string()
                }
            );
        }
    }

    #[test]
    fn test_mode_serde_uses_choice_values() {
        assert_eq!(serde_json::to_string(&Mode::Preprocessed).unwrap(), "\"scss\"");
        assert_eq!(serde_json::to_string(&Mode::Plain).unwrap(), "\"none\"");
    }

    #[test]
    fn test_draft_overlay_deserializes_partial_bodies() {
        let overlay: DraftOverlay = serde_json::from_str(r#"{"raw_source":"a{}"}"#).unwrap();
        assert_eq!(overlay.raw_source.as_deref(), Some("a{}"));
        assert!(overlay.mode.is_none());

        let empty: DraftOverlay = serde_json::from_str("{}").unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_content_hash_covers_mode() {
        let a = content_hash("a{}", "a{}", Mode::Plain);
        let b = content_hash("a{}", "a{}", Mode::Preprocessed);
        assert_ne!(a, b);
        assert_eq!(a, content_hash("a{}", "a{}", Mode::Plain));
    }
}
