//! Storage abstraction for stylesheet documents.
//!
//! The [`Store`] trait persists the pair of representations (raw source,
//! compiled output) plus the mode they were written under, keyed by a
//! logical document ID. Backends are pluggable: [`memory::InMemoryStore`]
//! here, and the SQLite store in the application crate.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::{Document, Mode, Revision};

/// Abstract storage backend for documents.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`get`](Store::get) | Read the persisted document, if any |
/// | [`put`](Store::put) | Atomically create or overwrite a document |
/// | [`revisions`](Store::revisions) | List saved revisions, oldest first |
///
/// # Atomicity
///
/// `put` writes `raw_source`, `compiled_output` and `mode` as one unit,
/// together with the scope's mode setting when `scope_mode` is given. A
/// concurrent `get` observes either the previous document or the new one,
/// never a mix of the two. A failed `put` changes neither the document nor
/// the mode setting.
///
/// Backends that persist mode settings implement
/// [`ModeSettings`](crate::mode::ModeSettings) over the same state, so the
/// setting written here is the one read back during mode resolution.
#[async_trait]
pub trait Store: Send + Sync {
    /// Retrieve the persisted document for `document_id`.
    async fn get(&self, document_id: &str) -> Result<Option<Document>, StoreError>;

    /// Create the document if absent, else overwrite all representations.
    ///
    /// `scope_mode`, when present, replaces the mode setting for the
    /// `document_id` scope in the same atomic write.
    ///
    /// Returns the store record ID, which stays stable across updates.
    async fn put(
        &self,
        document_id: &str,
        raw_source: &str,
        compiled_output: &str,
        mode: Mode,
        scope_mode: Option<Mode>,
    ) -> Result<String, StoreError>;

    /// Saved revisions for `document_id`, oldest first.
    async fn revisions(&self, document_id: &str) -> Result<Vec<Revision>, StoreError>;
}

/// Reject writes that would break the plain-mode representation invariant.
///
/// A plain CSS document serves its source verbatim, so both fields must
/// hold the same text.
pub fn check_representations(
    document_id: &str,
    raw_source: &str,
    compiled_output: &str,
    mode: Mode,
) -> Result<(), StoreError> {
    if mode == Mode::Plain && raw_source != compiled_output {
        return Err(StoreError::write(
            document_id,
            "plain CSS documents must store identical source and output",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_representations() {
        assert!(check_representations("d", "a{}", "a{}", Mode::Plain).is_ok());
        assert!(check_representations("d", "a{b{}}", "a b{}", Mode::Preprocessed).is_ok());
        let err = check_representations("d", "a{}", "b{}", Mode::Plain).unwrap_err();
        assert!(matches!(err, StoreError::Write { .. }));
    }
}
