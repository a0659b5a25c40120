use std::path::Path;
use std::sync::Arc;

use genai_agent_stream::prelude::*;
use genai_agent_stream::{ChatMessage, MessageRole};

/// Settings for one replay.
#[derive(Clone, Debug)]
pub struct ReplayOptions {
    pub session_id: String,
    pub pricing: Pricing,
    pub stream_buffer_capacity: usize,
    /// Prompt recorded as the user message preceding the response.
    pub prompt: Option<String>,
}

/// Everything a replay produced, including a failure if the trace broke.
pub struct ReplayOutcome {
    pub events: Vec<ChatEvent>,
    pub transcript: Transcript,
    pub result: Result<CostSummary, TransformError>,
}

/// Reads a JSONL trace file. See [`parse_trace`].
pub fn read_trace(path: &Path) -> std::io::Result<Vec<Result<RawTraceEvent, TransformError>>> {
    let text = std::fs::read_to_string(path)?;
    Ok(parse_trace(&text))
}

/// Parses one trace record per non-blank line.
///
/// A line that is not a valid record becomes an upstream error in its place,
/// so the replay stops there just as a live producer failure would.
pub fn parse_trace(text: &str) -> Vec<Result<RawTraceEvent, TransformError>> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str::<RawTraceEvent>(line)
                .map_err(|e| TransformError::upstream(format!("line {}: {e}", idx + 1)))
        })
        .collect()
}

/// Runs `trace` through a spawned response transform and folds the result.
pub async fn replay(
    trace: Vec<Result<RawTraceEvent, TransformError>>,
    options: ReplayOptions,
    sink: Arc<dyn LogSink>,
) -> Result<ReplayOutcome, TransformError> {
    let transform = ResponseTransform::new(options.session_id, sink).pricing(options.pricing);
    let mut response = spawn_response_stream(
        transform,
        futures::stream::iter(trace),
        options.stream_buffer_capacity,
    )?;

    let mut transcript = Transcript::new();
    if let Some(prompt) = options.prompt {
        transcript.push_user(prompt);
    }
    let mut events = Vec::new();
    while let Some(event) = response.next_event().await {
        match event {
            Ok(event) => {
                transcript.apply(event.clone());
                events.push(event);
            }
            Err(err) => {
                tracing::warn!(session_id = %response.session_id(), error = %err, "replay failed");
                transcript.fail(&err);
            }
        }
    }
    let result = response.finish().await;
    Ok(ReplayOutcome {
        events,
        transcript,
        result,
    })
}

/// Plain-text rendering of a transcript for terminals.
pub fn render_transcript(transcript: &Transcript) -> String {
    let mut out = String::new();
    for message in transcript.messages() {
        render_message(&mut out, message);
    }
    out
}

fn render_message(out: &mut String, message: &ChatMessage) {
    let label = match message.role {
        MessageRole::User => "user",
        MessageRole::Agent => "agent",
        MessageRole::Error => "error",
    };
    out.push_str(&format!("[{label}] {}\n", message.display_text()));
    for tool in &message.tools {
        out.push_str(&format!("  tool {}:\n", tool.name));
        for line in tool.pretty_input().lines() {
            out.push_str(&format!("    {line}\n"));
        }
    }
}
