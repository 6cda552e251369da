//! Tag configuration loading from config.toml
//!
//! Tags are a curated catalog with no public write endpoint. The entries in
//! config.toml seed the catalog on startup; slugs already present are left
//! untouched.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// List of tags to seed
    #[serde(default)]
    pub tags: Vec<TagConfig>,
}

/// Configuration for a single tag
#[derive(Debug, Deserialize, Clone)]
pub struct TagConfig {
    /// Display name of the tag
    pub name: String,
    /// Hex color, `#RRGGBB`
    pub color: String,
    /// Unique slug used in recipe filters
    pub slug: String,
}

/// Loads tag configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - Required fields are missing
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read config file: {e}"),
    })?;

    Ok(toml::from_str(&contents)?)
}

/// Loads the tag configuration from `CONFIG_PATH`, or ./config.toml.
///
/// A missing file is not an error: the catalog simply starts empty.
pub fn load_default_config() -> Result<Config> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    if !Path::new(&path).exists() {
        tracing::warn!("No tag configuration at {path}, skipping tag seeding");
        return Ok(Config::default());
    }
    load_config(path)
}
