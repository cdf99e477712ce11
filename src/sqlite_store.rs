//! SQLite-backed [`Store`] and [`ModeSettings`] implementation.
//!
//! `put` runs the document upsert, the revision append and the optional
//! mode setting write in one transaction, so readers see either the old
//! state or the new state.
//!
//! The store keeps a read-through cache of `document_id → record id` so
//! repeated reads hit the primary key. The cache is only a hint: a miss or
//! a stale entry falls back to the `document_id` lookup.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use custom_scss_core::error::StoreError;
use custom_scss_core::mode::ModeSettings;
use custom_scss_core::models::{content_hash, Document, Mode, Revision};
use custom_scss_core::store::{check_representations, Store};

/// SQLite implementation of the [`Store`] and [`ModeSettings`] traits.
///
/// Mode settings live in the `mode_settings` table, one row per scope.
pub struct SqliteStore {
    pool: SqlitePool,
    record_ids: RwLock<HashMap<String, String>>,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            record_ids: RwLock::new(HashMap::new()),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn cached_id(&self, document_id: &str) -> Option<String> {
        self.record_ids
            .read()
            .ok()
            .and_then(|ids| ids.get(document_id).cloned())
    }

    fn remember_id(&self, document_id: &str, id: &str) {
        if let Ok(mut ids) = self.record_ids.write() {
            ids.insert(document_id.to_string(), id.to_string());
        }
    }

    fn forget_id(&self, document_id: &str) {
        if let Ok(mut ids) = self.record_ids.write() {
            ids.remove(document_id);
        }
    }
}

const UPSERT_MODE_SETTING: &str = r#"
    INSERT INTO mode_settings (scope, value, updated_at)
    VALUES (?, ?, ?)
    ON CONFLICT(scope) DO UPDATE SET
        value = excluded.value,
        updated_at = excluded.updated_at
"#;

const DOCUMENT_COLUMNS: &str =
    "id, document_id, raw_source, compiled_output, mode, content_hash, created_at, updated_at";

fn parse_mode(document_id: &str, value: &str) -> Result<Mode, StoreError> {
    Mode::parse(value).map_err(|e| StoreError::read(document_id, e))
}

fn row_to_document(document_id: &str, row: &SqliteRow) -> Result<Document, StoreError> {
    let mode: String = row.get("mode");
    Ok(Document {
        id: row.get("id"),
        document_id: row.get("document_id"),
        raw_source: row.get("raw_source"),
        compiled_output: row.get("compiled_output"),
        mode: parse_mode(document_id, &mode)?,
        content_hash: row.get("content_hash"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[async_trait]
impl Store for SqliteStore {
    async fn get(&self, document_id: &str) -> Result<Option<Document>, StoreError> {
        if let Some(id) = self.cached_id(document_id) {
            let row = sqlx::query(&format!("SELECT {} FROM documents WHERE id = ?", DOCUMENT_COLUMNS))
                .bind(&id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| StoreError::read(document_id, e))?;
            match row {
                Some(row) if row.get::<String, _>("document_id") == document_id => {
                    return row_to_document(document_id, &row).map(Some);
                }
                _ => self.forget_id(document_id),
            }
        }

        let row = sqlx::query(&format!(
            "SELECT {} FROM documents WHERE document_id = ?",
            DOCUMENT_COLUMNS
        ))
        .bind(document_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::read(document_id, e))?;

        match row {
            Some(row) => {
                let doc = row_to_document(document_id, &row)?;
                self.remember_id(document_id, &doc.id);
                Ok(Some(doc))
            }
            None => Ok(None),
        }
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
        let write_err = |e: sqlx::Error| StoreError::write(document_id, e);

        let mut tx = self.pool.begin().await.map_err(write_err)?;

        let id: String = sqlx::query_scalar(
            r#"
            INSERT INTO documents (id, document_id, raw_source, compiled_output, mode,
                                   content_hash, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(document_id) DO UPDATE SET
                raw_source = excluded.raw_source,
                compiled_output = excluded.compiled_output,
                mode = excluded.mode,
                content_hash = excluded.content_hash,
                updated_at = excluded.updated_at
            RETURNING id
            "#,
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(document_id)
        .bind(raw_source)
        .bind(compiled_output)
        .bind(mode.as_str())
        .bind(&hash)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(write_err)?;

        let latest: Option<(i64, String)> = sqlx::query_as(
            r#"
            SELECT revision, content_hash FROM document_revisions
            WHERE document_id = ?
            ORDER BY revision DESC
            LIMIT 1
            "#,
        )
        .bind(document_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(write_err)?;

        let next_revision = match latest {
            Some((_, ref latest_hash)) if *latest_hash == hash => None,
            Some((revision, _)) => Some(revision + 1),
            None => Some(1),
        };

        if let Some(revision) = next_revision {
            sqlx::query(
                r#"
                INSERT INTO document_revisions (document_id, revision, raw_source,
                                                compiled_output, mode, content_hash, saved_at)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(document_id)
            .bind(revision)
            .bind(raw_source)
            .bind(compiled_output)
            .bind(mode.as_str())
            .bind(&hash)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(write_err)?;
        }

        if let Some(scope_mode) = scope_mode {
            sqlx::query(UPSERT_MODE_SETTING)
                .bind(document_id)
                .bind(scope_mode.as_str())
                .bind(now)
                .execute(&mut *tx)
                .await
                .map_err(write_err)?;
        }

        tx.commit().await.map_err(write_err)?;

        self.remember_id(document_id, &id);
        Ok(id)
    }

    async fn revisions(&self, document_id: &str) -> Result<Vec<Revision>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT revision, document_id, raw_source, compiled_output, mode, content_hash, saved_at
            FROM document_revisions
            WHERE document_id = ?
            ORDER BY revision ASC
            "#,
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::read(document_id, e))?;

        rows.iter()
            .map(|row| {
                let mode: String = row.get("mode");
                Ok(Revision {
                    revision: row.get("revision"),
                    document_id: row.get("document_id"),
                    raw_source: row.get("raw_source"),
                    compiled_output: row.get("compiled_output"),
                    mode: parse_mode(document_id, &mode)?,
                    content_hash: row.get("content_hash"),
                    saved_at: row.get("saved_at"),
                })
            })
            .collect()
    }
}

#[async_trait]
impl ModeSettings for SqliteStore {
    async fn persisted_mode(&self, scope: &str) -> Result<Option<String>, StoreError> {
        sqlx::query_scalar::<_, String>("SELECT value FROM mode_settings WHERE scope = ?")
            .bind(scope)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::read(scope, e))
    }

    async fn set_mode(&self, scope: &str, mode: Mode) -> Result<(), StoreError> {
        sqlx::query(UPSERT_MODE_SETTING)
            .bind(scope)
            .bind(mode.as_str())
            .bind(chrono::Utc::now().timestamp())
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::write(scope, e))?;
        Ok(())
    }
}
