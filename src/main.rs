//! # Custom SCSS CLI (`scssctl`)
//!
//! Manage custom stylesheets written as plain CSS or SCSS.
//!
//! ## Usage
//!
//! ```bash
//! scssctl --config ./config/scss.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `scssctl init` | Create the SQLite database and run schema migrations |
//! | `scssctl css <doc>` | Print the CSS served for a document |
//! | `scssctl source <doc>` | Print the source shown in the editor |
//! | `scssctl preview <doc>` | Resolve a draft without saving it |
//! | `scssctl save <doc>` | Compile (if SCSS) and save a document |
//! | `scssctl mode <doc> [value]` | Show or set the document mode |
//! | `scssctl history <doc>` | List saved revisions |
//! | `scssctl serve` | Start the HTTP preview server |
//!
//! ## Examples
//!
//! ```bash
//! # Save an SCSS stylesheet
//! scssctl save site --file ./custom.scss --mode scss
//!
//! # Try a change without saving it
//! scssctl preview site --file ./draft.scss
//!
//! # Switch back to plain CSS (takes effect on the next save)
//! scssctl mode site none
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use custom_scss::{config, get, migrate, mode_cmd, preview, save, server};

/// Custom SCSS CLI: plain CSS or SCSS custom stylesheets with live preview.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/scss.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "scssctl",
    about = "Custom stylesheets written in plain CSS or SCSS, compiled on save",
    version,
    long_about = "scssctl stores custom stylesheets with both their source and their compiled CSS. \
    SCSS is compiled once on save so page loads never compile, drafts can be previewed without \
    saving, and a draft that fails to compile falls back to the last saved CSS."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/scss.toml`.
    #[arg(long, global = true, default_value = "./config/scss.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Idempotent; running it multiple times is safe.
    Init,

    /// Print the CSS served for a document.
    ///
    /// Never compiles. Prints the configured default value when the document
    /// has not been saved.
    Css {
        /// Document ID (stylesheet scope).
        doc: String,
    },

    /// Print the source an editor would show for a document.
    Source {
        /// Document ID (stylesheet scope).
        doc: String,
    },

    /// Resolve a draft without saving it.
    ///
    /// Compiles the draft when the resolved mode is SCSS. If compilation
    /// fails, the last saved CSS is printed and the diagnostic goes to stderr.
    Preview {
        /// Document ID (stylesheet scope).
        doc: String,

        /// Draft source file, or `-` for stdin. Defaults to the saved source.
        #[arg(long)]
        file: Option<PathBuf>,

        /// Draft mode: `none` (plain CSS) or `scss`.
        #[arg(long)]
        mode: Option<String>,
    },

    /// Save a document.
    ///
    /// SCSS is compiled first; a compile failure saves nothing and exits
    /// non-zero with the compiler diagnostic.
    Save {
        /// Document ID (stylesheet scope).
        doc: String,

        /// Source file, or `-` for stdin. Defaults to the saved source.
        #[arg(long)]
        file: Option<PathBuf>,

        /// Mode to save with: `none` (plain CSS) or `scss`.
        #[arg(long)]
        mode: Option<String>,
    },

    /// Show the resolved mode of a document, or set it.
    ///
    /// Setting the mode does not recompile stored content until the next save.
    Mode {
        /// Document ID (stylesheet scope).
        doc: String,

        /// New mode: `none` (plain CSS) or `scss`.
        value: Option<String>,
    },

    /// List saved revisions of a document.
    History {
        /// Document ID (stylesheet scope).
        doc: String,
    },

    /// Start the HTTP preview server.
    ///
    /// Binds to the address configured in `[server].bind`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "custom_scss=info,custom_scss_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Css { doc } => {
            get::run_css(&cfg, &doc).await?;
        }
        Commands::Source { doc } => {
            get::run_source(&cfg, &doc).await?;
        }
        Commands::Preview { doc, file, mode } => {
            preview::run_preview(&cfg, &doc, file.as_deref(), mode).await?;
        }
        Commands::Save { doc, file, mode } => {
            save::run_save(&cfg, &doc, file.as_deref(), mode).await?;
        }
        Commands::Mode { doc, value } => {
            mode_cmd::run_mode(&cfg, &doc, value.as_deref()).await?;
        }
        Commands::History { doc } => {
            get::run_history(&cfg, &doc).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
