//! Session and turn data model.

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;
use thiserror::Error;

/// Maximum length (in characters) of a session's first-message preview.
pub const PREVIEW_MAX_CHARS: usize = 100;

/// Snapshot of one chat's conversation with the assistant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: String,
    /// Whether a turn for this id already succeeded (later turns resume it).
    pub established: bool,
    pub working_directory: PathBuf,
    /// Encoded project directory name in the transcript store, if one is selected.
    pub project_key: Option<String>,
}

/// A project discovered in the transcript store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectInfo {
    /// Directory name inside the store, e.g. `-Users-me-code-app`.
    pub project_key: String,
    /// Best-effort decoded filesystem path, e.g. `/Users/me/code/app`.
    pub resolved_path: PathBuf,
    pub session_count: usize,
}

/// Summary of a single transcript file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub working_directory: Option<PathBuf>,
    pub first_message_preview: String,
    /// Raw timestamp of the first user message as written by the assistant.
    pub timestamp: String,
    /// Number of user-turn records in the transcript.
    pub message_count: usize,
}

impl SessionSummary {
    /// Formats the timestamp as `YYYY-MM-DD HH:MM`, or `?` when absent.
    ///
    /// Unparseable timestamps are shown as their first 16 characters.
    pub fn display_timestamp(&self) -> String {
        if self.timestamp.is_empty() {
            return "?".to_string();
        }
        if let Ok(parsed) = DateTime::parse_from_rfc3339(&self.timestamp) {
            return parsed.format("%Y-%m-%d %H:%M").to_string();
        }
        if let Ok(parsed) = NaiveDateTime::parse_from_str(&self.timestamp, "%Y-%m-%dT%H:%M:%S%.f")
        {
            return parsed.format("%Y-%m-%d %H:%M").to_string();
        }
        self.timestamp
            .chars()
            .take(16)
            .collect::<String>()
            .replace('T', " ")
    }
}

/// A tool call the assistant wanted to make but was not allowed to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionDenial {
    pub tool_name: String,
    /// Tool-specific arguments; the shape depends on the tool.
    pub tool_input: Map<String, Value>,
}

impl PermissionDenial {
    /// Returns a string field of the tool input, if present.
    pub fn input_str(&self, key: &str) -> Option<&str> {
        self.tool_input.get(key).and_then(Value::as_str)
    }
}

/// Why a turn produced no usable reply.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TurnFailure {
    #[error(
        "Error: `{program}` could not be started ({reason}). Make sure Claude Code is installed and on your PATH."
    )]
    LaunchFailure { program: String, reason: String },

    #[error("[Timed out waiting for Claude response after {after_secs}s]")]
    TurnTimeout { after_secs: u64 },

    #[error("{}", exit_failure_message(.code, .stderr))]
    ProcessExitFailure { code: i32, stderr: String },
}

fn exit_failure_message(code: &i32, stderr: &str) -> String {
    let mut message = format!("Error: Claude CLI exited with code {code}.");
    if !stderr.is_empty() {
        message.push('\n');
        message.push_str(stderr);
    }
    message
}

/// Outcome of one assistant turn.
///
/// When `failure` is set, `text` carries its rendered message so callers can
/// always display `text`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TurnResult {
    pub text: String,
    /// In protocol arrival order.
    pub permission_denials: Vec<PermissionDenial>,
    pub failure: Option<TurnFailure>,
}

impl TurnResult {
    pub fn new(text: impl Into<String>, permission_denials: Vec<PermissionDenial>) -> Self {
        Self {
            text: text.into(),
            permission_denials,
            failure: None,
        }
    }

    pub fn failed(failure: TurnFailure) -> Self {
        Self {
            text: failure.to_string(),
            permission_denials: Vec::new(),
            failure: Some(failure),
        }
    }

    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    pub fn needs_approval(&self) -> bool {
        !self.permission_denials.is_empty()
    }
}
