//! Database schema migrations.
//!
//! All statements are `IF NOT EXISTS`, so running `scssctl init` twice is
//! safe.

use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Apply the schema to an open pool.
pub async fn apply(pool: &SqlitePool) -> Result<()> {
    // One row per logical document; both representations live in the
    // same row so a single UPDATE swaps them together.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            id TEXT PRIMARY KEY,
            document_id TEXT NOT NULL UNIQUE,
            raw_source TEXT NOT NULL,
            compiled_output TEXT NOT NULL,
            mode TEXT NOT NULL,
            content_hash TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS document_revisions (
            document_id TEXT NOT NULL,
            revision INTEGER NOT NULL,
            raw_source TEXT NOT NULL,
            compiled_output TEXT NOT NULL,
            mode TEXT NOT NULL,
            content_hash TEXT NOT NULL,
            saved_at INTEGER NOT NULL,
            PRIMARY KEY (document_id, revision)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS mode_settings (
            scope TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_documents_updated_at ON documents(updated_at DESC)",
    )
    .execute(pool)
    .await?;

    tracing::info!("schema up to date");
    Ok(())
}
