//! Turns an agent's execution trace into the chat events a chat UI renders.
//!
//! A [`ResponseTransform`] consumes LangChain-style trace records one at a
//! time, emits a `ResponseEvent` first, forwards text and tool calls, marks
//! turn boundaries, and totals token usage. When the trace ends normally it
//! logs one cost summary line.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use futures::StreamExt as _;
//! use genai_agent_stream::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), TransformError> {
//! let trace = futures::stream::iter(vec![Ok::<_, TransformError>(RawTraceEvent::new(
//!     "on_chat_model_stream",
//!     serde_json::json!({"chunk": {"content": "Hello"}}),
//! ))]);
//!
//! let mut transcript = Transcript::new();
//! let events = trace
//!     .through(ResponseTransform::new("session-1", Arc::new(TracingSink)))
//!     .collect::<Vec<_>>()
//!     .await;
//! for event in events {
//!     transcript.apply(event?);
//! }
//! # Ok(())
//! # }
//! ```

/// Normalized chat events.
pub mod chat;
/// Environment-driven settings.
pub mod config;
/// Stream drivers and the spawned response stream handle.
pub mod driver;
/// Error types.
pub mod errors;
/// Common imports for typical usage.
pub mod prelude;
/// Log sink contract.
pub mod sink;
/// Chat history folding.
pub mod transcript;
/// Raw and decoded trace events.
pub mod trace;
/// The response transform and the stream transform contract.
pub mod transform;
/// Token accounting and cost summaries.
pub mod usage;

pub use chat::{ChatEvent, TURN_BREAK};
pub use config::TransformConfig;
pub use driver::{AbortHandle, ResponseStream, TransformStreamExt, spawn_response_stream};
pub use errors::{SinkError, TransformError};
pub use sink::{LogSink, TracingSink};
pub use trace::{RawTraceEvent, TraceEvent, UsageSummary};
pub use transcript::{ChatMessage, MessageRole, ToolRecord, Transcript};
pub use transform::{ResponseTransform, StreamTransform};
pub use usage::{CostSummary, Pricing, UsageAccumulator};
