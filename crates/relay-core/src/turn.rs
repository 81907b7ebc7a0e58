//! Per-turn run options and the executor seam.

use crate::config::RelayConfig;
use crate::permission::PermissionMode;
use crate::session::TurnResult;
use async_trait::async_trait;
use std::path::Path;

/// Options for a single assistant turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOptions {
    pub model: String,
    /// Only set for the automatic continuation turn after an approval.
    pub permission_mode: Option<PermissionMode>,
    pub max_budget_usd: Option<String>,
    pub allowed_tools: Option<String>,
    /// Resume the session even if it is not known to be established.
    pub resume: bool,
}

impl TurnOptions {
    /// Creates options for `model` with no optional flags.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            permission_mode: None,
            max_budget_usd: None,
            allowed_tools: None,
            resume: false,
        }
    }

    /// Seeds options from the bridge configuration.
    pub fn from_config(config: &RelayConfig) -> Self {
        Self {
            model: config.model.clone(),
            permission_mode: None,
            max_budget_usd: config.max_budget_usd.clone(),
            allowed_tools: config.allowed_tools.clone(),
            resume: false,
        }
    }

    pub fn with_permission_mode(mut self, mode: PermissionMode) -> Self {
        self.permission_mode = Some(mode);
        self
    }

    pub fn with_resume(mut self, resume: bool) -> Self {
        self.resume = resume;
        self
    }
}

/// Runs one turn of the assistant for a session.
///
/// Implementations never fail: every problem is reported through
/// [`TurnResult::failure`].
#[async_trait]
pub trait TurnExecutor: Send + Sync {
    async fn execute(
        &self,
        prompt: &str,
        session_id: &str,
        options: &TurnOptions,
        working_directory: &Path,
    ) -> TurnResult;
}
