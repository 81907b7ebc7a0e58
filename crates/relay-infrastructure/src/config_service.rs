//! Configuration loading.
//!
//! Builds a [`RelayConfig`] in three layers: built-in defaults, then the
//! optional file `~/.config/relay/config.toml`, then environment variables.
//! An environment variable that is set but empty counts as unset.

use crate::paths::RelayPaths;
use relay_core::config::RelayConfig;
use relay_core::error::{RelayError, Result};
use std::path::{Path, PathBuf};

pub const ENV_CLAUDE_PATH: &str = "CLAUDE_PATH";
pub const ENV_CLAUDE_MODEL: &str = "CLAUDE_MODEL";
pub const ENV_CLAUDE_MAX_BUDGET: &str = "CLAUDE_MAX_BUDGET";
pub const ENV_CLAUDE_ALLOWED_TOOLS: &str = "CLAUDE_ALLOWED_TOOLS";
pub const ENV_CLAUDE_PROJECTS_DIR: &str = "CLAUDE_PROJECTS_DIR";
pub const ENV_DEFAULT_WORKING_DIRECTORY: &str = "DEFAULT_WORKING_DIRECTORY";
pub const ENV_LINE_TIMEOUT_SECS: &str = "RELAY_LINE_TIMEOUT_SECS";
pub const ENV_ALLOWED_USER_IDS: &str = "ALLOWED_USER_IDS";

/// Loads the bridge configuration.
#[derive(Debug, Clone)]
pub struct ConfigService {
    config_file: Option<PathBuf>,
}

impl ConfigService {
    /// Uses the default configuration file location, if one can be determined.
    pub fn new() -> Self {
        let config_file = match RelayPaths::config_file() {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::debug!("No configuration file location: {}", e);
                None
            }
        };
        Self { config_file }
    }

    /// Uses an explicit configuration file.
    pub fn with_file(path: impl Into<PathBuf>) -> Self {
        Self {
            config_file: Some(path.into()),
        }
    }

    pub fn config_file(&self) -> Option<&Path> {
        self.config_file.as_deref()
    }

    /// Loads the configuration from file and process environment.
    pub fn load(&self) -> Result<RelayConfig> {
        self.load_with_env(|key| std::env::var(key).ok())
    }

    /// Loads the configuration, reading variables through `lookup`.
    pub fn load_with_env<F>(&self, lookup: F) -> Result<RelayConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = self.load_file()?;
        apply_env_overrides(&mut config, lookup)?;
        Ok(config)
    }

    fn load_file(&self) -> Result<RelayConfig> {
        let Some(path) = self.config_file.as_deref() else {
            return Ok(RelayConfig::default());
        };
        if !path.is_file() {
            return Ok(RelayConfig::default());
        }

        let content = std::fs::read_to_string(path)?;
        let mut config: RelayConfig = toml::from_str(&content).map_err(|e| {
            RelayError::config(format!("Invalid config file {}: {}", path.display(), e))
        })?;
        config.claude_path = expand_home(&config.claude_path);
        config.projects_dir = expand_home(&config.projects_dir);
        config.default_working_directory = expand_home(&config.default_working_directory);
        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }
}

impl Default for ConfigService {
    fn default() -> Self {
        Self::new()
    }
}

/// Overlays environment variables onto `config`.
pub fn apply_env_overrides<F>(config: &mut RelayConfig, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

    if let Some(path) = get(ENV_CLAUDE_PATH) {
        config.claude_path = expand_home(Path::new(&path));
    }
    if let Some(model) = get(ENV_CLAUDE_MODEL) {
        config.model = model;
    }
    if let Some(budget) = get(ENV_CLAUDE_MAX_BUDGET) {
        config.max_budget_usd = Some(budget);
    }
    if let Some(tools) = get(ENV_CLAUDE_ALLOWED_TOOLS) {
        config.allowed_tools = Some(tools);
    }
    if let Some(dir) = get(ENV_CLAUDE_PROJECTS_DIR) {
        config.projects_dir = expand_home(Path::new(&dir));
    }
    if let Some(dir) = get(ENV_DEFAULT_WORKING_DIRECTORY) {
        config.default_working_directory = expand_home(Path::new(&dir));
    }
    if let Some(secs) = get(ENV_LINE_TIMEOUT_SECS) {
        config.line_timeout_secs = secs.trim().parse().map_err(|_| {
            RelayError::config(format!("{ENV_LINE_TIMEOUT_SECS} must be a number, got '{secs}'"))
        })?;
    }
    if let Some(ids) = get(ENV_ALLOWED_USER_IDS) {
        config.allowed_user_ids = parse_user_ids(&ids)?;
    }
    Ok(())
}

/// Parses a comma-separated list of numeric user ids.
pub fn parse_user_ids(value: &str) -> Result<Vec<i64>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(|id| {
            id.parse::<i64>().map_err(|_| {
                RelayError::config(format!("{ENV_ALLOWED_USER_IDS} contains an invalid id: '{id}'"))
            })
        })
        .collect()
}

/// Expands a leading `~` to the home directory.
fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match RelayPaths::home_dir() {
        Ok(home) => home.join(rest),
        Err(_) => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_file_or_env() {
        let temp_dir = TempDir::new().unwrap();
        let service = ConfigService::with_file(temp_dir.path().join("missing.toml"));

        let config = service.load_with_env(env(&[])).unwrap();
        assert_eq!(config, RelayConfig::default());
    }

    #[test]
    fn test_env_overrides_file() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("config.toml");
        std::fs::write(&file, "model = \"haiku\"\nmax_budget_usd = \"1.00\"\n").unwrap();
        let service = ConfigService::with_file(&file);

        let config = service
            .load_with_env(env(&[
                (ENV_CLAUDE_MODEL, "opus"),
                (ENV_CLAUDE_ALLOWED_TOOLS, "Read,Grep"),
                (ENV_ALLOWED_USER_IDS, "1, 2,,3"),
            ]))
            .unwrap();
        assert_eq!(config.model, "opus");
        assert_eq!(config.max_budget_usd.as_deref(), Some("1.00"));
        assert_eq!(config.allowed_tools.as_deref(), Some("Read,Grep"));
        assert_eq!(config.allowed_user_ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_empty_env_value_is_unset() {
        let mut config = RelayConfig::default();
        apply_env_overrides(&mut config, env(&[(ENV_CLAUDE_MODEL, ""), (ENV_CLAUDE_MAX_BUDGET, " ")]))
            .unwrap();
        assert_eq!(config.model, "sonnet");
        assert!(config.max_budget_usd.is_none());
    }

    #[test]
    fn test_invalid_values_are_config_errors() {
        let mut config = RelayConfig::default();
        let err = apply_env_overrides(&mut config, env(&[(ENV_LINE_TIMEOUT_SECS, "soon")]))
            .unwrap_err();
        assert!(matches!(err, RelayError::Config(_)));

        assert!(matches!(
            parse_user_ids("12,abc").unwrap_err(),
            RelayError::Config(_)
        ));
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("config.toml");
        std::fs::write(&file, "line_timeout_secs = \"never\"\n").unwrap();

        let err = ConfigService::with_file(&file)
            .load_with_env(env(&[]))
            .unwrap_err();
        assert!(matches!(err, RelayError::Config(_)));
    }

    #[test]
    fn test_expand_home() {
        let expanded = expand_home(Path::new("~/code"));
        if let Ok(home) = RelayPaths::home_dir() {
            assert_eq!(expanded, home.join("code"));
        }
        assert_eq!(expand_home(Path::new("/abs")), PathBuf::from("/abs"));
    }
}
