//! Value resolution protocol.
//!
//! Decides, for every read or write of a document, which of its two
//! representations is authoritative and when the compiler runs. Three call
//! paths share one [`Resolver`]:
//!
//! | Path | Method | Compiles | Writes |
//! |------|--------|----------|--------|
//! | Load | [`Resolver::load`] | never | never |
//! | Live preview | [`Resolver::preview`] | every request, when SCSS | never |
//! | Commit | [`Resolver::commit`] | once, when SCSS | one atomic `put` |
//!
//! # Preview fallback
//!
//! A draft that fails to compile during preview does not surface as an
//! error. The last known-good compiled output of the persisted document is
//! returned instead (or the default value when nothing was ever saved), so
//! a half-typed rule never corrupts the rendered page.
//!
//! # Commit ordering
//!
//! The mode is resolved before compilation, including a mode change
//! carried by the same draft. The compiled output, the source, the mode and
//! (for a draft mode) the scope's mode setting are then written together by
//! a single [`Store::put`]. A compile failure aborts the commit before
//! anything is written; a store failure leaves everything as it was.

use std::sync::Arc;

use serde::Serialize;

use crate::compiler::Compiler;
use crate::error::{CommitError, CompileError, ConfigurationError, StoreError};
use crate::mode::{resolve_mode, ModeResolution, ModeSettings};
use crate::models::{Document, DraftOverlay, Mode};
use crate::store::Store;

/// Where a single resolution request ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionState {
    /// Persisted value only.
    Loaded,
    /// Draft present, but its compilation failed and the last known-good
    /// output was served.
    Drafted,
    /// Draft resolved (compiled when SCSS) for preview only.
    PreviewResolved,
    /// Draft compiled and persisted.
    Committed,
}

/// Result of the live-preview path.
#[derive(Debug, Clone)]
pub struct PreviewOutcome {
    pub css: String,
    pub mode: Mode,
    pub state: ResolutionState,
    /// Compile error swallowed in favour of the last known-good output.
    pub fallback: Option<CompileError>,
    pub rejected: Vec<ConfigurationError>,
}

/// Result of a successful commit.
#[derive(Debug, Clone)]
pub struct CommitOutcome {
    /// Store record ID.
    pub id: String,
    pub mode: Mode,
    pub compiled_output: String,
    pub state: ResolutionState,
    /// Whether a draft mode was written to the mode settings.
    pub mode_persisted: bool,
    pub rejected: Vec<ConfigurationError>,
}

/// Resolves effective CSS for documents across load, preview and commit.
///
/// All collaborators are injected; the resolver holds no per-request state
/// and may be shared across tasks.
///
/// One backend serves as both the [`Store`] and the [`ModeSettings`], so the
/// mode setting written by a commit is the one read back on the next
/// resolution.
pub struct Resolver {
    store: Arc<dyn Store>,
    modes: Arc<dyn ModeSettings>,
    compiler: Arc<dyn Compiler>,
    default_value: String,
}

impl Resolver {
    pub fn new<S>(backend: Arc<S>, compiler: Arc<dyn Compiler>) -> Self
    where
        S: Store + ModeSettings + 'static,
    {
        let modes: Arc<dyn ModeSettings> = backend.clone();
        let store: Arc<dyn Store> = backend;
        Self {
            store,
            modes,
            compiler,
            default_value: String::new(),
        }
    }

    /// Text used when no document has been saved yet.
    pub fn with_default_value(mut self, default_value: impl Into<String>) -> Self {
        self.default_value = default_value.into();
        self
    }

    pub fn default_value(&self) -> &str {
        &self.default_value
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn modes(&self) -> &Arc<dyn ModeSettings> {
        &self.modes
    }

    /// Load path: the CSS to serve for a persisted document.
    ///
    /// Pure read, no compilation. A SCSS document serves its compiled
    /// output when that is non-empty; otherwise the raw source is served
    /// when non-empty. Missing or empty documents fall back to the default
    /// value.
    pub async fn load(&self, document_id: &str) -> Result<String, StoreError> {
        let persisted = self.store.get(document_id).await?;
        Ok(self.served_css(persisted.as_ref()))
    }

    /// The text an editor should show: the draft source, else the
    /// persisted source, else the persisted output, else the default.
    pub async fn editor_value(
        &self,
        document_id: &str,
        overlay: Option<&DraftOverlay>,
    ) -> Result<String, StoreError> {
        if let Some(source) = overlay.and_then(|o| o.raw_source.as_ref()) {
            return Ok(source.clone());
        }
        let persisted = self.store.get(document_id).await?;
        let value = persisted
            .as_ref()
            .and_then(|doc| {
                non_empty(&doc.raw_source).or_else(|| non_empty(&doc.compiled_output))
            })
            .unwrap_or(&self.default_value);
        Ok(value.to_string())
    }

    /// Resolve the active mode, honouring a draft mode if present.
    pub async fn resolve_mode(
        &self,
        document_id: &str,
        overlay: Option<&DraftOverlay>,
    ) -> Result<ModeResolution, StoreError> {
        let persisted = self.store.get(document_id).await?;
        resolve_mode(self.modes.as_ref(), document_id, persisted.as_ref(), overlay).await
    }

    /// Live-preview path.
    ///
    /// One store read and one mode resolution per call. Plain drafts are
    /// returned as is; SCSS drafts are recompiled on every call. Never
    /// writes. Compile errors fall back to the last known-good persisted
    /// output.
    pub async fn preview(
        &self,
        document_id: &str,
        overlay: &DraftOverlay,
    ) -> Result<PreviewOutcome, StoreError> {
        let persisted = self.store.get(document_id).await?;
        let resolution = resolve_mode(
            self.modes.as_ref(),
            document_id,
            persisted.as_ref(),
            Some(overlay),
        )
        .await?;
        let source = self.draft_source(persisted.as_ref(), overlay);

        if !resolution.mode.is_preprocessed() {
            return Ok(PreviewOutcome {
                css: source,
                mode: resolution.mode,
                state: ResolutionState::PreviewResolved,
                fallback: None,
                rejected: resolution.rejected,
            });
        }

        match self.compiler.compile(&source) {
            Ok(css) => Ok(PreviewOutcome {
                css,
                mode: resolution.mode,
                state: ResolutionState::PreviewResolved,
                fallback: None,
                rejected: resolution.rejected,
            }),
            Err(err) => {
                tracing::debug!(document_id, error = %err, "preview compile failed, serving last good output");
                Ok(PreviewOutcome {
                    css: self.last_known_good(persisted.as_ref()),
                    mode: resolution.mode,
                    state: ResolutionState::Drafted,
                    fallback: Some(err),
                    rejected: resolution.rejected,
                })
            }
        }
    }

    /// Commit path: compile if needed and persist both representations.
    ///
    /// On [`CommitError`] the store and the mode settings are untouched. A
    /// valid draft mode is persisted by the same `put` as the document.
    pub async fn commit(
        &self,
        document_id: &str,
        overlay: &DraftOverlay,
    ) -> Result<CommitOutcome, CommitError> {
        let persisted = self.store.get(document_id).await?;
        let resolution = resolve_mode(
            self.modes.as_ref(),
            document_id,
            persisted.as_ref(),
            Some(overlay),
        )
        .await?;
        let mode = resolution.mode;
        let source = self.draft_source(persisted.as_ref(), overlay);

        let compiled_output = match mode {
            Mode::Preprocessed => self.compiler.compile(&source).map_err(|err| {
                tracing::warn!(document_id, error = %err, "save aborted: source does not compile");
                err
            })?,
            Mode::Plain => source.clone(),
        };

        let mode_persisted = resolution.is_draft();
        let id = self
            .store
            .put(
                document_id,
                &source,
                &compiled_output,
                mode,
                mode_persisted.then_some(mode),
            )
            .await?;

        tracing::info!(document_id, %mode, id = %id, "document saved");

        Ok(CommitOutcome {
            id,
            mode,
            compiled_output,
            state: ResolutionState::Committed,
            mode_persisted,
            rejected: resolution.rejected,
        })
    }

    fn served_css(&self, persisted: Option<&Document>) -> String {
        let served = persisted.and_then(|doc| {
            let compiled = match doc.mode {
                Mode::Preprocessed => non_empty(&doc.compiled_output),
                Mode::Plain => None,
            };
            compiled.or_else(|| non_empty(&doc.raw_source))
        });
        served.unwrap_or(&self.default_value).to_string()
    }

    fn last_known_good(&self, persisted: Option<&Document>) -> String {
        persisted
            .and_then(|doc| non_empty(&doc.compiled_output))
            .unwrap_or(&self.default_value)
            .to_string()
    }

    fn draft_source(&self, persisted: Option<&Document>, overlay: &DraftOverlay) -> String {
        match (&overlay.raw_source, persisted) {
            (Some(source), _) => source.clone(),
            (None, Some(doc)) => doc.raw_source.clone(),
            (None, None) => self.default_value.clone(),
        }
    }
}

fn non_empty(s: &str) -> Option<&str> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}
