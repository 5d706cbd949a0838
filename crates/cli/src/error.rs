//! CLI error types.

use std::path::PathBuf;
use thiserror::Error;

/// CLI errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// No API key from flags, environment or config file.
    #[error(
        "API key is required. Set it with --api-key, the SCOPE3_API_KEY environment \
         variable, or 'scope3 config set api_key <key>'"
    )]
    MissingApiKey,

    #[error("unknown config key '{0}' (expected api_key, base_url or environment)")]
    UnknownConfigKey(String),

    /// The config file could not be parsed.
    #[error("failed to parse config at {path}: {reason}")]
    ConfigParse { path: PathBuf, reason: String },

    /// No home directory to keep the config file in.
    #[error("cannot locate config directory: HOME is not set")]
    NoConfigDir,

    /// A command-line argument could not be interpreted.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Client(#[from] client::Error),

    #[error(transparent)]
    Agents(#[from] agents::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("failed to write config: {0}")]
    TomlWrite(#[from] toml::ser::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
