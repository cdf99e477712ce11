//! Mode selection.
//!
//! Decides whether a document's source is plain CSS or SCSS. The mode has
//! the same draft/persisted duality as the content: an editing session may
//! carry an unsaved mode choice that overrides the persisted one.
//!
//! # Precedence
//!
//! 1. A draft mode value from the [`DraftOverlay`], if valid.
//! 2. The persisted mode setting for the document scope, else the mode
//!    stored on the document itself.
//! 3. [`Mode::Plain`].
//!
//! An invalid value at any level is rejected with a [`ConfigurationError`]
//! and resolution falls through to the next level. Values are never
//! coerced.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::{ConfigurationError, StoreError};
use crate::models::{Document, DraftOverlay, Mode};

/// Persisted mode choice per document scope.
///
/// Reads return the raw stored value so it can be validated here rather
/// than trusted.
#[async_trait]
pub trait ModeSettings: Send + Sync {
    async fn persisted_mode(&self, scope: &str) -> Result<Option<String>, StoreError>;

    async fn set_mode(&self, scope: &str, mode: Mode) -> Result<(), StoreError>;
}

/// Where a resolved mode came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeOrigin {
    Draft,
    Setting,
    Document,
    Default,
}

/// Outcome of [`resolve_mode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeResolution {
    pub mode: Mode,
    pub origin: ModeOrigin,
    /// Values that were rejected on the way down the precedence chain.
    pub rejected: Vec<ConfigurationError>,
}

impl ModeResolution {
    /// True when the mode was supplied by the draft overlay.
    pub fn is_draft(&self) -> bool {
        self.origin == ModeOrigin::Draft
    }
}

/// Resolve the active mode for `document_id`.
///
/// `persisted` is the already-loaded document, if any, so callers that
/// hold it avoid a second store read.
pub async fn resolve_mode(
    settings: &dyn ModeSettings,
    document_id: &str,
    persisted: Option<&Document>,
    overlay: Option<&DraftOverlay>,
) -> Result<ModeResolution, StoreError> {
    let mut rejected = Vec::new();

    if let Some(draft) = overlay.and_then(|o| o.mode.as_deref()) {
        match Mode::parse(draft) {
            Ok(mode) => {
                return Ok(ModeResolution {
                    mode,
                    origin: ModeOrigin::Draft,
                    rejected,
                })
            }
            Err(err) => {
                tracing::warn!(document_id, error = %err, "rejecting draft mode");
                rejected.push(err);
            }
        }
    }

    if let Some(value) = settings.persisted_mode(document_id).await? {
        match Mode::parse(&value) {
            Ok(mode) => {
                return Ok(ModeResolution {
                    mode,
                    origin: ModeOrigin::Setting,
                    rejected,
                })
            }
            Err(err) => {
                tracing::warn!(document_id, error = %err, "rejecting persisted mode setting");
                rejected.push(err);
            }
        }
    }

    if let Some(doc) = persisted {
        return Ok(ModeResolution {
            mode: doc.mode,
            origin: ModeOrigin::Document,
            rejected,
        });
    }

    Ok(ModeResolution {
        mode: Mode::Plain,
        origin: ModeOrigin::Default,
        rejected,
    })
}
