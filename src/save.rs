//! `scssctl save`: the commit path from the command line.

use std::path::Path;

use anyhow::Result;

use custom_scss_core::error::CommitError;

use crate::app::{overlay_from_args, App};
use crate::config::Config;

pub async fn run_save(
    config: &Config,
    document_id: &str,
    file: Option<&Path>,
    mode: Option<String>,
) -> Result<()> {
    let overlay = overlay_from_args(file, mode)?;
    let app = App::open(config).await?;
    let result = app.resolver.commit(document_id, &overlay).await;
    app.close().await;

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(CommitError::Compile(err)) => {
            eprintln!("Error: {} was not saved", document_id);
            eprintln!("{}", err);
            std::process::exit(1);
        }
        Err(err) => return Err(err.into()),
    };

    for rejected in &outcome.rejected {
        eprintln!("Warning: {}", rejected);
    }

    println!("Saved {} ({})", document_id, outcome.mode);
    println!("id:   {}", outcome.id);
    if outcome.mode_persisted {
        println!("mode: {} (persisted)", outcome.mode);
    }
    Ok(())
}
