//! Human approval of tool calls the assistant was not allowed to make.

use crate::chat::ChatId;
use relay_core::PermissionMode;
use relay_core::session::PermissionDenial;
use std::path::PathBuf;
use uuid::Uuid;

/// Prompt of the automatic turn that follows an approval.
pub const CONTINUATION_PROMPT: &str = "Please proceed with the previously requested operations.";

/// Longest tool input shown in an approval prompt.
pub const INPUT_PREVIEW_MAX_CHARS: usize = 200;

/// A pending request for the user to approve denied tool calls.
#[derive(Debug, Clone, PartialEq)]
pub struct ApprovalRequest {
    /// Short id the user refers to when approving or denying.
    pub id: String,
    pub chat_id: ChatId,
    pub session_id: String,
    pub working_directory: PathBuf,
    pub denials: Vec<PermissionDenial>,
    /// Mode for the continuation turn.
    pub permission_mode: PermissionMode,
    /// Human-readable prompt, see [`format_denials`].
    pub summary: String,
}

impl ApprovalRequest {
    pub fn new(
        chat_id: ChatId,
        session_id: impl Into<String>,
        working_directory: impl Into<PathBuf>,
        denials: Vec<PermissionDenial>,
    ) -> Self {
        Self {
            id: new_approval_id(),
            chat_id,
            session_id: session_id.into(),
            working_directory: working_directory.into(),
            permission_mode: PermissionMode::for_denials(&denials),
            summary: format_denials(&denials),
            denials,
        }
    }
}

fn new_approval_id() -> String {
    Uuid::new_v4().simple().to_string().chars().take(8).collect()
}

/// Renders denials as an approval prompt, one tool call per line.
pub fn format_denials(denials: &[PermissionDenial]) -> String {
    let mut lines = vec!["Claude needs permission for:\n".to_string()];
    for denial in denials {
        let tool = denial.tool_name.as_str();
        let line = match tool {
            "Write" | "Edit" | "Read" => {
                format!("  {tool}: {}", denial.input_str("file_path").unwrap_or("unknown"))
            }
            "Bash" => {
                let command = denial.input_str("command").unwrap_or("unknown");
                let mut shown = truncate_chars(command, INPUT_PREVIEW_MAX_CHARS);
                if shown.len() < command.len() {
                    shown.push_str("...");
                }
                format!("  Bash: {shown}")
            }
            _ => {
                let input = serde_json::to_string(&denial.tool_input).unwrap_or_default();
                format!("  {tool}: {}", truncate_chars(&input, INPUT_PREVIEW_MAX_CHARS))
            }
        };
        lines.push(line);
    }
    lines.join("\n")
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
