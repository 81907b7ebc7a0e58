//! Line-level decoding of the assistant's JSONL transcripts.
//!
//! Every line of a transcript is one JSON record. Only `user` records matter
//! here; all other record kinds, and lines that do not decode, are ignored.

use relay_core::session::{PREVIEW_MAX_CHARS, SessionSummary};
use serde::Deserialize;
use serde_json::Value;
use std::path::PathBuf;

#[derive(Debug, Deserialize)]
struct TranscriptRecord {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    message: Option<TranscriptMessage>,
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default)]
    cwd: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TranscriptMessage {
    #[serde(default)]
    content: Option<MessageContent>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Blocks(Vec<Value>),
    Other(Value),
}

impl MessageContent {
    /// Text of a plain string, or of the first `text` block.
    fn first_text(&self) -> Option<&str> {
        match self {
            MessageContent::Text(text) => Some(text),
            MessageContent::Blocks(blocks) => blocks
                .iter()
                .find(|block| block.get("type").and_then(Value::as_str) == Some("text"))
                .map(|block| block.get("text").and_then(Value::as_str).unwrap_or("")),
            MessageContent::Other(_) => None,
        }
    }
}

impl TranscriptRecord {
    fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        serde_json::from_str(line).ok()
    }

    fn is_user(&self) -> bool {
        self.kind.as_deref() == Some("user")
    }

    fn text(&self) -> Option<&str> {
        self.message
            .as_ref()
            .and_then(|message| message.content.as_ref())
            .and_then(MessageContent::first_text)
    }
}

/// Truncates `text` to at most [`PREVIEW_MAX_CHARS`] characters.
pub fn truncate_preview(text: &str) -> String {
    text.chars().take(PREVIEW_MAX_CHARS).collect()
}

/// Incrementally builds a [`SessionSummary`] from transcript lines.
///
/// The preview, timestamp and working directory all come from the first user
/// record that carries non-empty text. Every user record is counted.
#[derive(Debug, Default)]
pub struct TranscriptSummarizer {
    preview: Option<String>,
    timestamp: String,
    cwd: Option<PathBuf>,
    message_count: usize,
}

impl TranscriptSummarizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed_line(&mut self, line: &str) {
        let Some(record) = TranscriptRecord::parse(line) else {
            return;
        };
        if !record.is_user() {
            return;
        }
        self.message_count += 1;

        if self.preview.is_some() {
            return;
        }
        let Some(text) = record.text().filter(|text| !text.is_empty()) else {
            return;
        };
        self.preview = Some(truncate_preview(text));
        self.timestamp = record.timestamp.clone().unwrap_or_default();
        self.cwd = record
            .cwd
            .as_deref()
            .filter(|cwd| !cwd.is_empty())
            .map(PathBuf::from);
    }

    /// Returns the summary, or `None` when no user message had any text.
    pub fn finish(self, session_id: impl Into<String>) -> Option<SessionSummary> {
        let preview = self.preview?;
        Some(SessionSummary {
            session_id: session_id.into(),
            working_directory: self.cwd,
            first_message_preview: preview,
            timestamp: self.timestamp,
            message_count: self.message_count,
        })
    }
}

/// Returns the non-empty `cwd` of a user record, if `line` is one.
pub fn user_record_cwd(line: &str) -> Option<PathBuf> {
    let record = TranscriptRecord::parse(line)?;
    if !record.is_user() {
        return None;
    }
    record
        .cwd
        .filter(|cwd| !cwd.is_empty())
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summarize(lines: &[&str]) -> Option<SessionSummary> {
        let mut summarizer = TranscriptSummarizer::new();
        for line in lines {
            summarizer.feed_line(line);
        }
        summarizer.finish("abc")
    }

    #[test]
    fn test_plain_string_content() {
        let summary = summarize(&[
            r#"{"type":"user","message":{"content":"hello world"},"timestamp":"2024-01-01T00:00:00Z","cwd":"/tmp/proj"}"#,
        ])
        .unwrap();
        assert_eq!(summary.first_message_preview, "hello world");
        assert_eq!(summary.message_count, 1);
        assert_eq!(summary.working_directory, Some(PathBuf::from("/tmp/proj")));
        assert_eq!(summary.timestamp, "2024-01-01T00:00:00Z");
    }

    #[test]
    fn test_block_content_uses_first_text_block() {
        let summary = summarize(&[
            r#"{"type":"user","message":{"content":[{"type":"image"},{"type":"text","text":"from block"},{"type":"text","text":"second"}]}}"#,
        ])
        .unwrap();
        assert_eq!(summary.first_message_preview, "from block");
        assert_eq!(summary.timestamp, "");
        assert!(summary.working_directory.is_none());
    }

    #[test]
    fn test_tool_results_are_counted_but_not_previewed() {
        let summary = summarize(&[
            r#"{"type":"user","message":{"content":[{"type":"tool_result","content":"ok"}]},"cwd":"/a"}"#,
            r#"{"type":"assistant","message":{"content":[{"type":"text","text":"reply"}]}}"#,
            r#"{"type":"user","message":{"content":"real question"},"cwd":"/b"}"#,
        ])
        .unwrap();
        assert_eq!(summary.first_message_preview, "real question");
        assert_eq!(summary.working_directory, Some(PathBuf::from("/b")));
        assert_eq!(summary.message_count, 2);
    }

    #[test]
    fn test_preview_is_truncated() {
        let long = "x".repeat(250);
        let line = format!(r#"{{"type":"user","message":{{"content":"{long}"}}}}"#);
        let summary = summarize(&[&line]).unwrap();
        assert_eq!(summary.first_message_preview.chars().count(), PREVIEW_MAX_CHARS);
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let summary = summarize(&[
            "not json",
            "",
            r#"{"type":"user","message":{"content":"after garbage"}}"#,
        ])
        .unwrap();
        assert_eq!(summary.first_message_preview, "after garbage");
        assert_eq!(summary.message_count, 1);
    }

    #[test]
    fn test_no_user_text_yields_none() {
        assert!(summarize(&[r#"{"type":"assistant","message":{"content":"hi"}}"#]).is_none());
        assert!(summarize(&[r#"{"type":"user","message":{"content":""}}"#]).is_none());
        assert!(summarize(&[]).is_none());
    }

    #[test]
    fn test_user_record_cwd() {
        assert_eq!(
            user_record_cwd(r#"{"type":"user","cwd":"/work"}"#),
            Some(PathBuf::from("/work"))
        );
        assert_eq!(user_record_cwd(r#"{"type":"user","cwd":""}"#), None);
        assert_eq!(user_record_cwd(r#"{"type":"summary","cwd":"/work"}"#), None);
        assert_eq!(user_record_cwd("{broken"), None);
    }
}
