//! Server settings read from environment variables.
//!
//! Every setting has a default; a value that fails to parse falls back to the
//! default with a warning instead of aborting startup.

use std::{env, fmt::Display, path::PathBuf, str::FromStr};
use tracing::{info, warn};

/// Runtime settings for the HTTP server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address to bind, e.g. `0.0.0.0:8000`
    pub bind_address: String,
    /// Directory uploaded images are written to
    pub media_root: PathBuf,
    /// How many recipes a subscription preview shows by default
    pub recipes_preview_limit: u64,
}

impl ServerConfig {
    /// Reads `BIND_ADDRESS`, `MEDIA_ROOT` and `RECIPES_PREVIEW_LIMIT`.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            bind_address: try_load("BIND_ADDRESS", "0.0.0.0:8000"),
            media_root: PathBuf::from(try_load::<String>("MEDIA_ROOT", "media")),
            recipes_preview_limit: try_load("RECIPES_PREVIEW_LIMIT", "3"),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_string(),
            media_root: PathBuf::from("media"),
            recipes_preview_limit: 3,
        }
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    let raw = env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.parse().unwrap_or_else(|e| {
        warn!("Invalid {key} value {raw:?}: {e}, using default: {default}");
        parse_default(default)
    })
}

#[allow(clippy::panic)]
fn parse_default<T: FromStr>(default: &str) -> T
where
    T::Err: Display,
{
    default
        .parse()
        .unwrap_or_else(|e| panic!("built-in default {default:?} does not parse: {e}"))
}
