//! Error types for the addon core.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the core crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by configuration loading and formatting.
///
/// None of these ever reach the host. Bootstrap problems are reported by the
/// binary before a widget exists; formatting problems are recovered by the
/// widget itself.
#[derive(Debug, Error)]
pub enum Error {
    #[error("config file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration:\n  {}", .0.join("\n  "))]
    ConfigValidation(Vec<String>),

    #[error(transparent)]
    Format(#[from] FormatError),
}

/// Failure of the locale formatter for one render.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("unsupported locale '{0}'")]
    UnknownLocale(String),

    #[error("formatter rejected pattern '{0}'")]
    Pattern(String),
}

/// Outcome of a font stylesheet load that did not succeed.
///
/// Always recovered locally by keeping the fallback fonts of the family stack.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FontLoadError {
    #[error("stylesheet failed to load: {0}")]
    Failed(String),

    #[error("stylesheet load timed out")]
    TimedOut,
}
