//! `scssctl preview`: resolve a draft without saving it.

use std::path::Path;

use anyhow::Result;

use crate::app::{overlay_from_args, App};
use crate::config::Config;

pub async fn run_preview(
    config: &Config,
    document_id: &str,
    file: Option<&Path>,
    mode: Option<String>,
) -> Result<()> {
    let overlay = overlay_from_args(file, mode)?;
    let app = App::open(config).await?;
    let outcome = app.resolver.preview(document_id, &overlay).await?;
    app.close().await;

    for rejected in &outcome.rejected {
        eprintln!("Warning: {}", rejected);
    }
    if let Some(ref err) = outcome.fallback {
        eprintln!("Warning: draft does not compile, showing last saved CSS");
        eprintln!("{}", err);
    }

    print!("{}", outcome.css);
    if !outcome.css.ends_with('\n') {
        println!();
    }
    Ok(())
}
