pub mod ask;
pub mod chat;
pub mod store;

use anyhow::{Result, bail};
use relay_core::RelayConfig;
use relay_interaction::ClaudeCodeExecutor;

/// Fails with a readable message if the assistant executable cannot be found.
pub fn ensure_available(executor: &ClaudeCodeExecutor) -> Result<()> {
    if !executor.is_available() {
        bail!(
            "`{}` not found. Install Claude Code or set CLAUDE_PATH.",
            executor.program().display()
        );
    }
    Ok(())
}

/// Logs the settings a run will use.
pub fn log_settings(config: &RelayConfig) {
    tracing::info!("Claude executable: {}", config.claude_path.display());
    tracing::info!("Model: {}", config.model);
    tracing::info!(
        "Budget cap: {}",
        config.max_budget_usd.as_deref().unwrap_or("not set")
    );
    tracing::info!(
        "Allowed tools: {}",
        config.allowed_tools.as_deref().unwrap_or("not set")
    );
    tracing::info!("Transcript store: {}", config.projects_dir.display());
    tracing::info!(
        "Default working directory: {}",
        config.default_working_directory.display()
    );
}
