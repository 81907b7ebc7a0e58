//! Runtime configuration for the bridge.
//!
//! The struct is filled by `relay_infrastructure::config_service`, which layers
//! an optional TOML file and environment variables over these defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default per-line read timeout for the assistant's output stream.
pub const DEFAULT_LINE_TIMEOUT_SECS: u64 = 300;

/// Default model alias passed to the assistant CLI.
pub const DEFAULT_MODEL: &str = "sonnet";

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct RelayConfig {
    /// Assistant executable; a bare name is resolved through PATH.
    pub claude_path: PathBuf,
    pub model: String,
    /// Spending cap forwarded verbatim to the CLI (e.g. "5.00").
    pub max_budget_usd: Option<String>,
    /// Tool allowlist forwarded verbatim to the CLI (e.g. "Read,Grep").
    pub allowed_tools: Option<String>,
    /// Root of the assistant's transcript store (`~/.claude/projects`).
    pub projects_dir: PathBuf,
    pub default_working_directory: PathBuf,
    pub line_timeout_secs: u64,
    /// Chat users allowed to talk to the bridge. Empty means everyone.
    pub allowed_user_ids: Vec<i64>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("/"));
        Self {
            claude_path: PathBuf::from("claude"),
            model: DEFAULT_MODEL.to_string(),
            max_budget_usd: None,
            allowed_tools: None,
            projects_dir: home.join(".claude").join("projects"),
            default_working_directory: home,
            line_timeout_secs: DEFAULT_LINE_TIMEOUT_SECS,
            allowed_user_ids: Vec::new(),
        }
    }
}

impl RelayConfig {
    pub fn line_timeout(&self) -> Duration {
        Duration::from_secs(self.line_timeout_secs)
    }

    /// Returns true if the given chat user may use the bridge.
    pub fn is_user_allowed(&self, user_id: i64) -> bool {
        self.allowed_user_ids.is_empty() || self.allowed_user_ids.contains(&user_id)
    }

    /// Collects human-readable configuration problems.
    ///
    /// An empty list means the configuration is usable.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if !self.projects_dir.is_dir() {
            errors.push(format!(
                "Claude projects directory not found: {}",
                self.projects_dir.display()
            ));
        }
        if self.line_timeout_secs == 0 {
            errors.push("line_timeout_secs must be greater than zero".to_string());
        }
        if self.model.trim().is_empty() {
            errors.push("model must not be empty".to_string());
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RelayConfig::default();
        assert_eq!(config.model, "sonnet");
        assert_eq!(config.line_timeout(), Duration::from_secs(300));
        assert!(config.projects_dir.ends_with(".claude/projects"));
        assert!(config.max_budget_usd.is_none());
    }

    #[test]
    fn test_user_allow_list() {
        let mut config = RelayConfig::default();
        assert!(config.is_user_allowed(42));

        config.allowed_user_ids = vec![1, 2];
        assert!(config.is_user_allowed(2));
        assert!(!config.is_user_allowed(42));
    }

    #[test]
    fn test_validate_reports_missing_projects_dir() {
        let config = RelayConfig {
            projects_dir: PathBuf::from("/definitely/not/here/projects"),
            line_timeout_secs: 0,
            ..RelayConfig::default()
        };
        let errors = config.validate();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("/definitely/not/here/projects"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: RelayConfig = toml::from_str("model = \"opus\"\nline_timeout_secs = 10\n").unwrap();
        assert_eq!(config.model, "opus");
        assert_eq!(config.line_timeout_secs, 10);
        assert_eq!(config.claude_path, PathBuf::from("claude"));
    }
}
