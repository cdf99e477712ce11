//! `scssctl mode`: inspect or set the persisted mode of a document.
//!
//! Setting the mode only updates the mode setting. Stored content is not
//! recompiled until the next save.

use anyhow::Result;

use custom_scss_core::models::Mode;

use crate::app::App;
use crate::config::Config;

pub async fn run_mode(config: &Config, document_id: &str, value: Option<&str>) -> Result<()> {
    let app = App::open(config).await?;

    match value {
        Some(value) => {
            let mode = Mode::parse(value)?;
            app.resolver.modes().set_mode(document_id, mode).await?;
            println!("Mode for {} set to {}.", document_id, mode);
            if mode.is_preprocessed() {
                println!("Run `scssctl save {}` to recompile the stored source.", document_id);
            }
        }
        None => {
            let resolution = app.resolver.resolve_mode(document_id, None).await?;
            for rejected in &resolution.rejected {
                eprintln!("Warning: {}", rejected);
            }
            println!("mode:   {}", resolution.mode);
            println!(
                "origin: {}",
                serde_json::to_value(resolution.origin)?
                    .as_str()
                    .unwrap_or_default()
            );
        }
    }

    app.close().await;
    Ok(())
}
