//! Wiring of the SQLite backend, the compiler and the resolver.
//!
//! Every CLI command and the HTTP server open an [`App`] from the loaded
//! [`Config`]; nothing is kept in process-wide state.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::SqlitePool;

use custom_scss_core::compiler::GrassCompiler;
use custom_scss_core::models::DraftOverlay;
use custom_scss_core::resolve::Resolver;

use crate::config::Config;
use crate::db;
use crate::migrate;
use crate::sqlite_store::SqliteStore;

pub struct App {
    pub pool: SqlitePool,
    pub resolver: Arc<Resolver>,
}

impl App {
    /// Connect to the database, apply migrations, and build the resolver.
    pub async fn open(config: &Config) -> Result<App> {
        let pool = db::connect(config).await?;
        migrate::apply(&pool).await?;

        let store = Arc::new(SqliteStore::new(pool.clone()));
        let compiler = Arc::new(GrassCompiler::new(config.compiler.clone()));
        let resolver = Resolver::new(store, compiler)
            .with_default_value(config.documents.default_value.clone());

        Ok(App {
            pool,
            resolver: Arc::new(resolver),
        })
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}

/// Build a draft overlay from CLI arguments.
///
/// `file` may be `-` to read the source from stdin.
pub fn overlay_from_args(file: Option<&Path>, mode: Option<String>) -> Result<DraftOverlay> {
    let raw_source = match file {
        Some(path) if path == Path::new("-") => {
            let mut buf = String::new();
            std::io::Read::read_to_string(&mut std::io::stdin(), &mut buf)
                .context("Failed to read source from stdin")?;
            Some(buf)
        }
        Some(path) => Some(
            std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read source file: {}", path.display()))?,
        ),
        None => None,
    };
    Ok(DraftOverlay { mode, raw_source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlay_from_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("custom.scss");
        std::fs::write(&path, ".a { .b { c: d; } }").unwrap();

        let overlay = overlay_from_args(Some(&path), Some("scss".into())).unwrap();
        assert_eq!(overlay.raw_source.as_deref(), Some(".a { .b { c: d; } }"));
        assert_eq!(overlay.mode.as_deref(), Some("scss"));
    }

    #[test]
    fn test_overlay_without_file_is_mode_only() {
        let overlay = overlay_from_args(None, Some("none".into())).unwrap();
        assert!(overlay.raw_source.is_none());
    }

    #[test]
    fn test_overlay_missing_file() {
        let err = overlay_from_args(Some(Path::new("/no/such.scss")), None).unwrap_err();
        assert!(err.to_string().contains("Failed to read source file"));
    }
}
