//! Read-only document commands.
//!
//! `scssctl css`, `scssctl source` and `scssctl history` all go through the
//! resolver's load path and never compile or write.

use anyhow::Result;
use serde::Serialize;

use custom_scss_core::models::Revision;

use crate::app::App;
use crate::config::Config;

/// Revision entry as printed by `scssctl history` and served by
/// `GET /documents/{id}/revisions`.
#[derive(Debug, Clone, Serialize)]
pub struct RevisionResponse {
    pub revision: i64,
    pub mode: String,
    pub content_hash: String,
    pub saved_at: String, // ISO8601
    pub source: String,
    pub css: String,
}

impl From<Revision> for RevisionResponse {
    fn from(rev: Revision) -> Self {
        RevisionResponse {
            revision: rev.revision,
            mode: rev.mode.as_str().to_string(),
            content_hash: rev.content_hash,
            saved_at: format_ts_iso(rev.saved_at),
            source: rev.raw_source,
            css: rev.compiled_output,
        }
    }
}

pub async fn run_css(config: &Config, document_id: &str) -> Result<()> {
    let app = App::open(config).await?;
    let css = app.resolver.load(document_id).await?;
    app.close().await;

    print!("{}", css);
    if !css.ends_with('\n') {
        println!();
    }
    Ok(())
}

pub async fn run_source(config: &Config, document_id: &str) -> Result<()> {
    let app = App::open(config).await?;
    let source = app.resolver.editor_value(document_id, None).await?;
    app.close().await;

    print!("{}", source);
    if !source.ends_with('\n') {
        println!();
    }
    Ok(())
}

pub async fn list_revisions(config: &Config, document_id: &str) -> Result<Vec<RevisionResponse>> {
    let app = App::open(config).await?;
    let revisions = app.resolver.store().revisions(document_id).await?;
    app.close().await;
    Ok(revisions.into_iter().map(RevisionResponse::from).collect())
}

pub async fn run_history(config: &Config, document_id: &str) -> Result<()> {
    let revisions = list_revisions(config, document_id).await?;

    if revisions.is_empty() {
        println!("No revisions for '{}'.", document_id);
        return Ok(());
    }

    println!("--- Revisions of {} ({}) ---", document_id, revisions.len());
    for rev in &revisions {
        println!(
            "#{:<4} {:<5} {}  {}",
            rev.revision,
            rev.mode,
            rev.saved_at,
            &rev.content_hash[..rev.content_hash.len().min(12)]
        );
    }
    Ok(())
}

pub fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| ts.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use custom_scss_core::models::Mode;

    #[test]
    fn test_format_ts_iso() {
        assert_eq!(format_ts_iso(0), "1970-01-01T00:00:00Z");
        assert_eq!(format_ts_iso(1_700_000_000), "2023-11-14T22:13:20Z");
    }

    #[test]
    fn test_revision_response_labels_representations() {
        let rev = Revision {
            revision: 2,
            document_id: "site".into(),
            raw_source: "a { b { c: d } }".into(),
            compiled_output: "a b {\n  c: d;\n}\n".into(),
            mode: Mode::Preprocessed,
            content_hash: "abc".into(),
            saved_at: 0,
        };
        let resp = RevisionResponse::from(rev);
        assert_eq!(resp.mode, "scss");
        assert_eq!(resp.source, "a { b { c: d } }");
        assert!(resp.css.starts_with("a b {"));
    }
}
