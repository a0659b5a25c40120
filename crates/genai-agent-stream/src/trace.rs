//! Agent execution trace events as delivered by the upstream producer.
//!
//! The wire shape follows LangChain's `streamEvents` (v2) records: an `event`
//! discriminator, the emitting runnable's `name`, and a kind-specific `data`
//! payload. [`TraceEvent::decode`] narrows a raw record to the kinds the
//! response transform understands.

use serde::{Deserialize, Serialize};

use crate::errors::TransformError;

/// Incremental output from a chat model.
pub const MODEL_STREAM: &str = "on_chat_model_stream";
/// A chat model finished one generation.
pub const MODEL_END: &str = "on_chat_model_end";
/// The agent started a tool call.
pub const TOOL_START: &str = "on_tool_start";

/// One trace record exactly as the producer sends it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawTraceEvent {
    /// Event kind discriminator (for example `on_chat_model_stream`).
    pub event: String,
    /// Name of the runnable that emitted the event (tool name for tool events).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Kind-specific payload.
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl RawTraceEvent {
    /// Creates a record with the given kind and payload.
    pub fn new(event: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            event: event.into(),
            name: None,
            data,
            run_id: None,
            tags: Vec::new(),
            metadata: None,
        }
    }

    /// Sets the emitting runnable's name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Trace events the response transform acts on.
#[derive(Clone, Debug, PartialEq)]
pub enum TraceEvent {
    /// A streamed fragment of model output.
    ModelStream(MessageChunk),
    /// A model turn ended, optionally reporting token usage.
    ModelEnd { usage: Option<UsageSummary> },
    /// The agent invoked a tool.
    ToolStart {
        name: String,
        input: serde_json::Value,
    },
    /// Any kind this crate does not understand. Ignored downstream.
    Other { kind: String },
}

impl TraceEvent {
    /// Narrows a raw record to a typed event.
    ///
    /// Unknown kinds decode to [`TraceEvent::Other`]. Known kinds with a
    /// payload that breaks the producer contract are an error.
    pub fn decode(raw: RawTraceEvent) -> Result<Self, TransformError> {
        let RawTraceEvent {
            event,
            name,
            mut data,
            ..
        } = raw;
        match event.as_str() {
            MODEL_STREAM => {
                let chunk = match data.get_mut("chunk") {
                    Some(value) if !value.is_null() => unwrap_serialized(value.take()),
                    _ => return Err(TransformError::malformed(MODEL_STREAM, "missing data.chunk")),
                };
                let chunk = serde_json::from_value::<MessageChunk>(chunk)
                    .map_err(|e| TransformError::malformed(MODEL_STREAM, e.to_string()))?;
                Ok(Self::ModelStream(chunk))
            }
            MODEL_END => {
                let usage = match data.get_mut("output") {
                    Some(output) if !output.is_null() => {
                        let mut output = unwrap_serialized(output.take());
                        match output.get_mut("usage_metadata") {
                            Some(usage) if !usage.is_null() => Some(
                                serde_json::from_value::<UsageSummary>(usage.take()).map_err(
                                    |e| TransformError::malformed(MODEL_END, e.to_string()),
                                )?,
                            ),
                            _ => None,
                        }
                    }
                    _ => None,
                };
                Ok(Self::ModelEnd { usage })
            }
            TOOL_START => {
                let name = name
                    .filter(|n| !n.trim().is_empty())
                    .ok_or_else(|| TransformError::malformed(TOOL_START, "missing tool name"))?;
                // The tool's arguments sit one level below the runnable input.
                let input = data
                    .pointer_mut("/input/input")
                    .map(serde_json::Value::take)
                    .ok_or_else(|| {
                        TransformError::malformed(TOOL_START, "missing data.input.input")
                    })?;
                Ok(Self::ToolStart { name, input })
            }
            _ => Ok(Self::Other { kind: event }),
        }
    }
}

/// LangChain may serialize messages in constructor form
/// (`{"lc": 1, "type": "constructor", "kwargs": {...}}`); returns the kwargs
/// in that case and the value untouched otherwise.
fn unwrap_serialized(mut value: serde_json::Value) -> serde_json::Value {
    if value.get("lc").is_some()
        && let Some(kwargs) = value.get_mut("kwargs")
    {
        return kwargs.take();
    }
    value
}

/// Streamed model output fragment.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageChunk {
    #[serde(default)]
    pub content: Option<MessageContent>,
    #[serde(default)]
    pub tool_call_chunks: Option<Vec<ToolCallChunk>>,
}

impl MessageChunk {
    /// A plain text fragment.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: Some(MessageContent::Text(text.into())),
            tool_call_chunks: None,
        }
    }

    /// True when the fragment carries any partial tool call.
    pub fn has_tool_call_chunks(&self) -> bool {
        self.tool_call_chunks
            .as_ref()
            .is_some_and(|chunks| !chunks.is_empty())
    }

    /// Text form of the fragment's content.
    pub fn content_text(&self) -> String {
        self.content
            .as_ref()
            .map(MessageContent::to_text)
            .unwrap_or_default()
    }
}

/// Message content: a bare string or a list of typed parts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    /// Concatenates text parts in order; non-text parts contribute nothing.
    pub fn to_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Parts(parts) => parts.iter().filter_map(ContentPart::text).collect(),
        }
    }
}

/// One element of list-shaped content.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContentPart {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl ContentPart {
    fn text(&self) -> Option<&str> {
        match self.kind.as_str() {
            "text" | "text_delta" => self.text.as_deref(),
            _ => None,
        }
    }
}

/// Partial tool call streamed alongside model output.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolCallChunk {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<i64>,
}

/// Token usage reported for one finished model turn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageSummary {
    #[serde(default)]
    pub input_tokens: Option<u64>,
    #[serde(default)]
    pub output_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u64>,
}

impl UsageSummary {
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens: Some(input_tokens),
            output_tokens: Some(output_tokens),
            total_tokens: None,
        }
    }
}
