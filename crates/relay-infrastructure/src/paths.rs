//! Well-known locations used by relay.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/relay/             # relay's own config directory
//! └── config.toml              # optional configuration file
//!
//! ~/.claude/projects/          # the assistant's transcript store (read-only)
//! ├── -Users-me-code-app/      # one directory per project
//! │   ├── <session-id>.jsonl   # one transcript per session
//! │   └── ...
//! └── ...
//! ```

use std::path::PathBuf;

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Home directory could not be determined.
    HomeDirNotFound,
    /// Platform config directory could not be determined.
    ConfigDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::HomeDirNotFound => write!(f, "Cannot find home directory"),
            PathError::ConfigDirNotFound => write!(f, "Cannot find config directory"),
        }
    }
}

impl std::error::Error for PathError {}

/// Unified path management for relay.
pub struct RelayPaths;

impl RelayPaths {
    /// Returns the user's home directory.
    pub fn home_dir() -> Result<PathBuf, PathError> {
        dirs::home_dir().ok_or(PathError::HomeDirNotFound)
    }

    /// Returns relay's configuration directory (e.g. `~/.config/relay/`).
    pub fn config_dir() -> Result<PathBuf, PathError> {
        dirs::config_dir()
            .map(|dir| dir.join("relay"))
            .ok_or(PathError::ConfigDirNotFound)
    }

    /// Returns the path to the optional configuration file.
    pub fn config_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }
}
