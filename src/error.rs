use std::path::PathBuf;

use crate::engine::{Direction, IllegalMoveReason};

/// Errors raised while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Validation(String),
}

/// Errors raised while playing games.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("state offers no legal actions besides Stop")]
    NoLegalActions,

    #[error("player chose illegal action {action} ({reason:?})")]
    IllegalMove {
        action: Direction,
        reason: IllegalMoveReason,
    },

    #[error("invalid layout at line {line}: {reason}")]
    InvalidLayout { line: usize, reason: String },

    #[error("unknown layout '{0}'")]
    UnknownLayout(String),
}

pub type Result<T> = std::result::Result<T, Error>;
