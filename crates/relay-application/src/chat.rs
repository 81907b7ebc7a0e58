use std::fmt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Identifier of a chat on the front-end (one conversation window).
pub type ChatId = i64;

/// Identifier of the person writing in a chat.
pub type UserId = i64;

/// Generates a fresh session id for the assistant.
pub fn new_session_id() -> String {
    Uuid::new_v4().to_string()
}

/// Per-chat conversation state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatSession {
    pub session_id: String,
    /// Selected project in the transcript store.
    pub project_key: Option<String>,
    pub working_directory: PathBuf,
}

impl ChatSession {
    pub fn new(working_directory: impl Into<PathBuf>) -> Self {
        Self {
            session_id: new_session_id(),
            project_key: None,
            working_directory: working_directory.into(),
        }
    }

    /// Switches to a new session id and returns the previous one.
    pub fn restart(&mut self) -> String {
        std::mem::replace(&mut self.session_id, new_session_id())
    }

    pub fn has_project(&self) -> bool {
        self.project_key.is_some()
    }
}

/// What `/status` shows for a chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatStatus {
    pub working_directory: PathBuf,
    pub project_key: Option<String>,
    pub session_id: String,
    pub model: String,
    pub max_budget_usd: Option<String>,
}

impl fmt::Display for ChatStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Project: {}", short_path(&self.working_directory))?;
        writeln!(f, "Session: {}...", short_id(&self.session_id))?;
        writeln!(f, "Model: {}", self.model)?;
        write!(
            f,
            "Budget: {}",
            self.max_budget_usd.as_deref().unwrap_or("not set")
        )
    }
}

/// First eight characters of a session id.
pub fn short_id(session_id: &str) -> &str {
    match session_id.char_indices().nth(8) {
        Some((index, _)) => &session_id[..index],
        None => session_id,
    }
}

/// Replaces the home directory prefix with `~` for display.
pub fn short_path(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(rest) = path.strip_prefix(&home) {
            if rest.as_os_str().is_empty() {
                return "~".to_string();
            }
            return format!("~/{}", rest.display());
        }
    }
    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restart_returns_previous_id() {
        let mut chat = ChatSession::new("/tmp");
        let first = chat.session_id.clone();

        let previous = chat.restart();
        assert_eq!(previous, first);
        assert_ne!(chat.session_id, first);
        assert_eq!(chat.session_id.len(), 36);
    }

    #[test]
    fn test_short_id() {
        assert_eq!(short_id("0123456789abcdef"), "01234567");
        assert_eq!(short_id("abc"), "abc");
    }

    #[test]
    fn test_short_path_outside_home() {
        assert_eq!(short_path(Path::new("/opt/project")), "/opt/project");
    }

    #[test]
    fn test_status_display() {
        let status = ChatStatus {
            working_directory: PathBuf::from("/opt/project"),
            project_key: Some("-opt-project".to_string()),
            session_id: "0123456789abcdef".to_string(),
            model: "sonnet".to_string(),
            max_budget_usd: None,
        };
        assert_eq!(
            status.to_string(),
            "Project: /opt/project\nSession: 01234567...\nModel: sonnet\nBudget: not set"
        );
    }
}
