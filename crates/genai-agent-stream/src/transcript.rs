use serde::{Deserialize, Serialize};

use crate::chat::ChatEvent;
use crate::errors::TransformError;

/// Shown for an agent message whose payload is still empty.
pub const WORKING_PLACEHOLDER: &str = "Working...";

/// Who a transcript entry belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Agent,
    Error,
}

/// A tool call attached to an agent message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolRecord {
    pub name: String,
    pub input: serde_json::Value,
}

impl ToolRecord {
    /// Pretty JSON for display. String inputs holding JSON are parsed first.
    pub fn pretty_input(&self) -> String {
        let parsed = match &self.input {
            serde_json::Value::String(raw) => serde_json::from_str(raw).ok(),
            _ => None,
        };
        let value = parsed.as_ref().unwrap_or(&self.input);
        serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub payload: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default)]
    pub tools: Vec<ToolRecord>,
}

impl ChatMessage {
    fn new(role: MessageRole, payload: impl Into<String>, session_id: Option<String>) -> Self {
        Self {
            role,
            payload: payload.into(),
            session_id,
            tools: Vec::new(),
        }
    }

    /// Payload without trailing turn breaks.
    ///
    /// An agent message that has received no text yet reads `Working...`.
    pub fn display_text(&self) -> &str {
        if self.role == MessageRole::Agent && self.payload.is_empty() {
            return WORKING_PLACEHOLDER;
        }
        self.payload.trim_end_matches('\n')
    }
}

/// Chat history built from user prompts and streamed chat events.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn push_user(&mut self, text: impl Into<String>) {
        self.messages
            .push(ChatMessage::new(MessageRole::User, text, None));
    }

    /// Folds one chat event into the history.
    ///
    /// `ResponseEvent` opens a new agent message; chunks and tool calls land
    /// on the latest agent message, opening one if the response start was
    /// never seen.
    pub fn apply(&mut self, event: ChatEvent) {
        match event {
            ChatEvent::ResponseEvent { session_id } => self.messages.push(ChatMessage::new(
                MessageRole::Agent,
                "",
                Some(session_id),
            )),
            ChatEvent::ChunkEvent { token } => self.current_agent().payload.push_str(&token),
            ChatEvent::ToolEvent { name, input } => {
                self.current_agent().tools.push(ToolRecord { name, input })
            }
        }
    }

    /// Records a failed response as an error entry.
    pub fn fail(&mut self, err: &TransformError) {
        self.messages
            .push(ChatMessage::new(MessageRole::Error, err.to_string(), None));
    }

    fn current_agent(&mut self) -> &mut ChatMessage {
        let open = matches!(self.messages.last(), Some(m) if m.role == MessageRole::Agent);
        if !open {
            self.messages
                .push(ChatMessage::new(MessageRole::Agent, "", None));
        }
        let last = self.messages.len() - 1;
        &mut self.messages[last]
    }
}

impl Extend<ChatEvent> for Transcript {
    fn extend<I: IntoIterator<Item = ChatEvent>>(&mut self, iter: I) {
        for event in iter {
            self.apply(event);
        }
    }
}
