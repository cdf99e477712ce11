//! In-memory [`Store`] and [`ModeSettings`] implementation for testing
//! and embedding.
//!
//! Uses `HashMap` behind one `std::sync::RwLock`. Documents, their
//! revision lists and the per-scope mode settings live under the same lock,
//! so a `put` (including its optional mode write) is a single critical
//! section and readers never see a half-written state.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::mode::ModeSettings;
use crate::models::{content_hash, Document, Mode, Revision};

use super::{check_representations, Store};

struct StoredDoc {
    doc: Document,
    revisions: Vec<Revision>,
}

#[derive(Default)]
struct State {
    docs: HashMap<String, StoredDoc>,
    /// Raw choice values, so a bad value written by another tool is still
    /// caught by validation on read.
    modes: HashMap<String, String>,
}

/// In-memory document store and mode settings.
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State::default()),
        }
    }

    /// Store a raw, unvalidated mode value. Used to seed settings.
    pub fn set_raw_mode(&self, scope: &str, value: &str) {
        if let Ok(mut state) = self.state.write() {
            state.modes.insert(scope.to_string(), value.to_string());
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned(_: impl std::fmt::Display) -> StoreError {
    StoreError::Unavailable("in-memory store lock poisoned".to_string())
}

#[async_trait]
impl Store for InMemoryStore {
    async fn get(&self, document_id: &str) -> Result<Option<Document>, StoreError> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state.docs.get(document_id).map(|s| s.doc.clone()))
    }

    async fn put(
        &self,
        document_id: &str,
        raw_source: &str,
        compiled_output: &str,
        mode: Mode,
        scope_mode: Option<Mode>,
    ) -> Result<String, StoreError> {
        check_representations(document_id, raw_source, compiled_output, mode)?;

        let now = chrono::Utc::now().timestamp();
        let hash = content_hash(raw_source, compiled_output, mode);

        let mut state = self.state.write().map_err(poisoned)?;
        let stored = state
            .docs
            .entry(document_id.to_string())
            .or_insert_with(|| StoredDoc {
                doc: Document {
                    id: uuid::Uuid::new_v4().to_string(),
                    document_id: document_id.to_string(),
                    raw_source: String::new(),
                    compiled_output: String::new(),
                    mode,
                    content_hash: String::new(),
                    created_at: now,
                    updated_at: now,
                },
                revisions: Vec::new(),
            });

        stored.doc.raw_source = raw_source.to_string();
        stored.doc.compiled_output = compiled_output.to_string();
        stored.doc.mode = mode;
        stored.doc.content_hash = hash.clone();
        stored.doc.updated_at = now;

        let unchanged = stored
            .revisions
            .last()
            .is_some_and(|r| r.content_hash == hash);
        if !unchanged {
            let revision = stored.revisions.len() as i64 + 1;
            stored.revisions.push(Revision {
                revision,
                document_id: document_id.to_string(),
                raw_source: raw_source.to_string(),
                compiled_output: compiled_output.to_string(),
                mode,
                content_hash: hash,
                saved_at: now,
            });
        }
        let id = stored.doc.id.clone();

        if let Some(scope_mode) = scope_mode {
            state
                .modes
                .insert(document_id.to_string(), scope_mode.as_str().to_string());
        }

        Ok(id)
    }

    async fn revisions(&self, document_id: &str) -> Result<Vec<Revision>, StoreError> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state
            .docs
            .get(document_id)
            .map(|s| s.revisions.clone())
            .unwrap_or_default())
    }
}

#[async_trait]
impl ModeSettings for InMemoryStore {
    async fn persisted_mode(&self, scope: &str) -> Result<Option<String>, StoreError> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state.modes.get(scope).cloned())
    }

    async fn set_mode(&self, scope: &str, mode: Mode) -> Result<(), StoreError> {
        let mut state = self.state.write().map_err(poisoned)?;
        state
            .modes
            .insert(scope.to_string(), mode.as_str().to_string());
        Ok(())
    }
}
