//! Shared error types

use thiserror::Error;

/// Result type alias for shared operations
pub type Result<T> = std::result::Result<T, ClipError>;

/// Errors shared by every crate in the workspace
#[derive(Error, Debug)]
pub enum ClipError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid value for {name}: {value}")]
    InvalidSetting { name: &'static str, value: String },
}

impl ClipError {
    /// Shorthand for a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        ClipError::Config(message.into())
    }
}

/// Read an optional environment variable and parse it, falling back to `default`
/// when unset. A value that is set but does not parse is an error rather than
/// silently replaced.
pub fn env_or<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T> {
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| ClipError::InvalidSetting { name, value: raw }),
        _ => Ok(default),
    }
}

/// Read an optional, non-empty environment variable
pub fn env_opt(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
