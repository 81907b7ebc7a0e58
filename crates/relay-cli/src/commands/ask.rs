use super::ensure_available;
use anyhow::{Result, bail};
use relay_application::chat::new_session_id;
use relay_application::format_denials;
use relay_core::session::SessionStateTracker;
use relay_core::{PermissionMode, RelayConfig, TurnExecutor, TurnOptions};
use relay_interaction::ClaudeCodeExecutor;
use std::path::PathBuf;

pub struct AskArgs {
    pub prompt: String,
    pub session_id: Option<String>,
    pub cwd: Option<PathBuf>,
    pub resume: bool,
    pub permission_mode: Option<PermissionMode>,
}

pub async fn run(config: &RelayConfig, args: AskArgs) -> Result<()> {
    let executor = ClaudeCodeExecutor::from_config(config, SessionStateTracker::new());
    ensure_available(&executor)?;

    let session_id = args.session_id.unwrap_or_else(new_session_id);
    let working_directory = args
        .cwd
        .unwrap_or_else(|| config.default_working_directory.clone());
    let mut options = TurnOptions::from_config(config).with_resume(args.resume);
    if let Some(mode) = args.permission_mode {
        options = options.with_permission_mode(mode);
    }

    let result = executor
        .execute(&args.prompt, &session_id, &options, &working_directory)
        .await;
    eprintln!("Session: {}", session_id);

    if let Some(failure) = &result.failure {
        bail!("{}", failure);
    }
    if !result.text.is_empty() {
        println!("{}", result.text);
    }
    if result.needs_approval() {
        println!();
        println!("{}", format_denials(&result.permission_denials));
        println!(
            "\nRe-run with --resume --session-id {} --permission-mode {} to allow.",
            session_id,
            PermissionMode::for_denials(&result.permission_denials)
        );
    }
    Ok(())
}
