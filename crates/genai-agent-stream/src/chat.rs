use serde::{Deserialize, Serialize};

/// Token emitted between model turns so consumers can separate them visually.
pub const TURN_BREAK: &str = "\n\n";

/// Normalized chat events consumed by the transcript layer.
///
/// Serialized with a `type` tag (`ResponseEvent`, `ChunkEvent`, `ToolEvent`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ChatEvent {
    /// First event of every response.
    ResponseEvent {
        #[serde(rename = "sessionId")]
        session_id: String,
    },
    /// Generated text, or [`TURN_BREAK`] after a finished turn.
    ChunkEvent { token: String },
    /// The agent invoked a tool.
    ToolEvent {
        name: String,
        input: serde_json::Value,
    },
}

impl ChatEvent {
    pub fn chunk(token: impl Into<String>) -> Self {
        Self::ChunkEvent {
            token: token.into(),
        }
    }

    pub fn turn_break() -> Self {
        Self::chunk(TURN_BREAK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_type_tag_and_camel_case_session() {
        let value = serde_json::to_value(ChatEvent::ResponseEvent {
            session_id: "s-1".into(),
        })
        .expect("serialize");
        assert_eq!(
            value,
            serde_json::json!({"type": "ResponseEvent", "sessionId": "s-1"})
        );

        let tool: ChatEvent = serde_json::from_str(
            r#"{"type":"ToolEvent","name":"search","input":{"query":"x"}}"#,
        )
        .expect("deserialize");
        assert_eq!(
            tool,
            ChatEvent::ToolEvent {
                name: "search".into(),
                input: serde_json::json!({"query": "x"}),
            }
        );
    }
}
