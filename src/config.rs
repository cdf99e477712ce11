//! TOML configuration parsing and validation.
//!
//! ```toml
//! [db]
//! path = "./data/scss.sqlite"
//!
//! [compiler]
//! style = "expanded"          # or "compressed"
//! load_paths = ["./scss"]     # optional, enables @use / @import
//!
//! [documents]
//! default_value = ""
//!
//! [server]
//! bind = "127.0.0.1:7341"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use custom_scss_core::compiler::CompilerOptions;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub compiler: CompilerOptions,
    #[serde(default)]
    pub documents: DocumentsConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct DocumentsConfig {
    /// Served when a document has never been saved.
    #[serde(default)]
    pub default_value: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7341".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.db.path.as_os_str().is_empty() {
        anyhow::bail!("db.path must not be empty");
    }

    for dir in &config.compiler.load_paths {
        if !dir.is_dir() {
            anyhow::bail!("compiler.load_paths entry is not a directory: {}", dir.display());
        }
    }

    if config.server.bind.parse::<std::net::SocketAddr>().is_err() {
        anyhow::bail!(
            "server.bind must be a socket address like 127.0.0.1:7341, got '{}'",
            config.server.bind
        );
    }

    Ok(())
}
