//! Decoder for the assistant's `stream-json` output.
//!
//! Every stdout line is one JSON object with a `type` discriminator. Only
//! three kinds carry data for the bridge; everything else, including lines
//! that are not JSON at all, is ignored.

use relay_core::session::{PermissionDenial, TurnResult};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

/// Tool name used when a denial does not say which tool it was for.
pub const UNKNOWN_TOOL: &str = "unknown";

/// One decoded protocol line.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// A complete assistant message.
    Assistant {
        #[serde(default, deserialize_with = "null_as_default")]
        message: AssistantMessage,
    },
    /// Incremental output.
    ContentBlockDelta {
        #[serde(default, deserialize_with = "null_as_default")]
        delta: Delta,
    },
    /// Terminal event of a turn.
    Result {
        #[serde(default)]
        result: Option<String>,
        #[serde(default, deserialize_with = "null_as_default")]
        permission_denials: Vec<RawDenial>,
    },
    #[serde(other)]
    Other,
}

/// Content blocks stay untyped so one odd block cannot hide its neighbours.
#[derive(Debug, Default, Deserialize)]
pub struct AssistantMessage {
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: Vec<Value>,
}

impl AssistantMessage {
    /// Text of the `text` blocks, in order. Blocks of other kinds, or without
    /// a string `text`, are skipped.
    pub fn text_blocks(&self) -> impl Iterator<Item = &str> {
        self.content
            .iter()
            .filter(|block| block.get("type").and_then(Value::as_str) == Some("text"))
            .filter_map(|block| block.get("text").and_then(Value::as_str))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Delta {
    TextDelta {
        #[serde(default, deserialize_with = "null_as_default")]
        text: String,
    },
    #[default]
    #[serde(other)]
    Other,
}

/// Treats an explicit `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Denial record as it appears on the wire.
#[derive(Debug, Deserialize)]
pub struct RawDenial {
    #[serde(default)]
    tool_name: Option<String>,
    #[serde(default)]
    tool_input: Option<Value>,
}

impl From<RawDenial> for PermissionDenial {
    fn from(raw: RawDenial) -> Self {
        let tool_input = match raw.tool_input {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };
        PermissionDenial {
            tool_name: raw.tool_name.unwrap_or_else(|| UNKNOWN_TOOL.to_string()),
            tool_input,
        }
    }
}

impl StreamEvent {
    /// Decodes one line. Blank lines and non-JSON lines yield `None`.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        match serde_json::from_str(line) {
            Ok(event) => Some(event),
            Err(e) => {
                tracing::debug!("Ignoring undecodable output line ({}): {}", e, line);
                None
            }
        }
    }
}

/// Folds protocol events into a [`TurnResult`].
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    chunks: Vec<String>,
    denials: Vec<PermissionDenial>,
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed_line(&mut self, line: &str) {
        if let Some(event) = StreamEvent::parse(line) {
            self.apply(event);
        }
    }

    pub fn apply(&mut self, event: StreamEvent) {
        match event {
            StreamEvent::Assistant { message } => {
                for text in message.text_blocks() {
                    self.push_text(text.to_string());
                }
            }
            StreamEvent::ContentBlockDelta {
                delta: Delta::TextDelta { text },
            } => self.push_text(text),
            StreamEvent::ContentBlockDelta { .. } => {}
            StreamEvent::Result {
                result,
                permission_denials,
            } => {
                if self.chunks.is_empty() {
                    if let Some(result) = result {
                        self.push_text(result);
                    }
                }
                self.denials
                    .extend(permission_denials.into_iter().map(PermissionDenial::from));
            }
            StreamEvent::Other => {}
        }
    }

    fn push_text(&mut self, text: String) {
        if !text.is_empty() {
            self.chunks.push(text);
        }
    }

    /// Whether any text was collected so far.
    pub fn has_text(&self) -> bool {
        !self.chunks.is_empty()
    }

    pub fn into_result(self) -> TurnResult {
        let text = self.chunks.concat();
        TurnResult::new(text.trim(), self.denials)
    }
}
