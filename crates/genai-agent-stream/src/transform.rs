use std::borrow::{Borrow, BorrowMut};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::chat::ChatEvent;
use crate::errors::TransformError;
use crate::sink::LogSink;
use crate::trace::{RawTraceEvent, TraceEvent};
use crate::usage::{CostSummary, Pricing, UsageAccumulator};

/// A stateful one-in/one-out stream stage with start, item, and end hooks.
///
/// Drivers call `start` once before the first item, `transform` once per item
/// in arrival order (never concurrently), and `flush` once after the last item
/// of a stream that ended normally. A stream that fails is never flushed.
pub trait StreamTransform {
    type Input;
    type Output;

    /// Output emitted before any item. `None` after the first call.
    fn start(&mut self) -> Option<Self::Output>;

    /// Maps one input item to zero or one output item.
    fn transform(&mut self, item: Self::Input) -> Result<Option<Self::Output>, TransformError>;

    /// End-of-stream side effects. Emits nothing.
    fn flush(&mut self);
}

/// Converts agent trace events into chat events for one response and tracks
/// its token usage.
///
/// Usage is held as any `BorrowMut<UsageAccumulator>`: owned by default, or a
/// caller's `&mut UsageAccumulator` via [`ResponseTransform::with_usage`].
pub struct ResponseTransform<U = UsageAccumulator> {
    session_id: String,
    sink: Arc<dyn LogSink>,
    usage: U,
    pricing: Pricing,
    started: bool,
    flushed: bool,
}

impl ResponseTransform {
    /// Creates a transform with a fresh accumulator.
    pub fn new(session_id: impl Into<String>, sink: Arc<dyn LogSink>) -> Self {
        Self::with_usage(session_id, sink, UsageAccumulator::new())
    }
}

impl<U: BorrowMut<UsageAccumulator>> ResponseTransform<U> {
    /// Creates a transform that adds into the given accumulator.
    pub fn with_usage(session_id: impl Into<String>, sink: Arc<dyn LogSink>, usage: U) -> Self {
        Self {
            session_id: session_id.into(),
            sink,
            usage,
            pricing: Pricing::default(),
            started: false,
            flushed: false,
        }
    }

    /// Overrides the per-thousand-token rates used for the cost summary.
    pub fn pricing(mut self, pricing: Pricing) -> Self {
        self.pricing = pricing;
        self
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Current token totals.
    pub fn usage(&self) -> &UsageAccumulator {
        self.usage.borrow()
    }

    fn usage_mut(&mut self) -> &mut UsageAccumulator {
        self.usage.borrow_mut()
    }

    /// Releases the accumulator.
    pub fn into_usage(self) -> U {
        self.usage
    }

    /// Dispatches one decoded trace event.
    pub fn handle(&mut self, event: TraceEvent) -> Option<ChatEvent> {
        match event {
            TraceEvent::ModelStream(chunk) => {
                if chunk.has_tool_call_chunks() {
                    return None;
                }
                Some(ChatEvent::chunk(chunk.content_text()))
            }
            TraceEvent::ModelEnd { usage } => {
                if let Some(usage) = usage {
                    self.usage_mut().record(&usage);
                    debug!(
                        session_id = %self.session_id,
                        input_tokens = ?usage.input_tokens,
                        output_tokens = ?usage.output_tokens,
                        "model turn usage"
                    );
                }
                Some(ChatEvent::turn_break())
            }
            TraceEvent::ToolStart { name, input } => Some(ChatEvent::ToolEvent { name, input }),
            TraceEvent::Other { .. } => None,
        }
    }

    /// Computes and logs the cost summary.
    ///
    /// Returns the summary on the first call and `None` afterwards.
    pub fn complete(&mut self) -> Option<CostSummary> {
        if self.flushed {
            return None;
        }
        self.flushed = true;
        let summary = CostSummary::compute(&self.session_id, self.usage(), self.pricing);
        self.log(&summary.to_string());
        Some(summary)
    }

    fn log(&self, message: &str) {
        if let Err(err) = self.sink.info(message) {
            warn!(session_id = %self.session_id, error = %err, "dropping usage log line");
        }
    }
}

impl<U: BorrowMut<UsageAccumulator>> StreamTransform for ResponseTransform<U> {
    type Input = RawTraceEvent;
    type Output = ChatEvent;

    fn start(&mut self) -> Option<ChatEvent> {
        if self.started {
            return None;
        }
        self.started = true;
        Some(ChatEvent::ResponseEvent {
            session_id: self.session_id.clone(),
        })
    }

    fn transform(&mut self, item: RawTraceEvent) -> Result<Option<ChatEvent>, TransformError> {
        let event = TraceEvent::decode(item)?;
        Ok(self.handle(event))
    }

    fn flush(&mut self) {
        let _ = self.complete();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::TURN_BREAK;
    use crate::sink::testing::RecordingSink;
    use crate::trace::{MODEL_END, MODEL_STREAM, MessageChunk, TOOL_START};
    use serde_json::json;

    fn text_delta(text: &str) -> RawTraceEvent {
        RawTraceEvent::new(MODEL_STREAM, json!({"chunk": {"content": text}}))
    }

    fn model_end(input: u64, output: u64) -> RawTraceEvent {
        RawTraceEvent::new(
            MODEL_END,
            json!({"output": {"usage_metadata": {"input_tokens": input, "output_tokens": output}}}),
        )
    }

    fn run(
        transform: &mut ResponseTransform<impl BorrowMut<UsageAccumulator>>,
        items: Vec<RawTraceEvent>,
    ) -> Vec<ChatEvent> {
        let mut out: Vec<ChatEvent> = transform.start().into_iter().collect();
        for item in items {
            out.extend(transform.transform(item).expect("transform"));
        }
        transform.flush();
        out
    }

    #[test]
    fn response_event_comes_first_whatever_the_input() {
        let sink = Arc::new(RecordingSink::default());
        let mut transform = ResponseTransform::new("session-1", sink);
        let out = run(&mut transform, vec![model_end(1, 1), text_delta("x")]);
        assert_eq!(
            out[0],
            ChatEvent::ResponseEvent {
                session_id: "session-1".into()
            }
        );
        assert_eq!(transform.start(), None);
    }

    #[test]
    fn tool_call_fragments_are_suppressed() {
        let sink = Arc::new(RecordingSink::default());
        let mut transform = ResponseTransform::new("s", sink);
        transform.start();
        let item = RawTraceEvent::new(
            MODEL_STREAM,
            json!({"chunk": {"content": "ignored", "tool_call_chunks": [{"args": "{"}]}}),
        );
        assert_eq!(transform.transform(item).expect("transform"), None);
    }

    #[test]
    fn empty_tool_call_list_still_passes_text() {
        let sink = Arc::new(RecordingSink::default());
        let mut transform = ResponseTransform::new("s", sink);
        let item = RawTraceEvent::new(
            MODEL_STREAM,
            json!({"chunk": {"content": "Hi", "tool_call_chunks": []}}),
        );
        assert_eq!(
            transform.transform(item).expect("transform"),
            Some(ChatEvent::chunk("Hi"))
        );
    }

    #[test]
    fn text_delta_passes_through() {
        let sink = Arc::new(RecordingSink::default());
        let mut transform = ResponseTransform::new("s", sink);
        assert_eq!(
            transform.transform(text_delta("Hello")).expect("transform"),
            Some(ChatEvent::chunk("Hello"))
        );
        assert_eq!(
            transform.handle(TraceEvent::ModelStream(MessageChunk::text(" world"))),
            Some(ChatEvent::chunk(" world"))
        );
    }

    #[test]
    fn model_end_without_usage_emits_break_and_keeps_counters() {
        let sink = Arc::new(RecordingSink::default());
        let mut transform = ResponseTransform::new("s", sink);
        let out = transform
            .transform(RawTraceEvent::new(MODEL_END, json!({"output": {"content": "x"}})))
            .expect("transform");
        assert_eq!(out, Some(ChatEvent::chunk(TURN_BREAK)));
        assert_eq!(*transform.usage(), UsageAccumulator::default());
    }

    #[test]
    fn usage_accumulates_across_turns() {
        let sink = Arc::new(RecordingSink::default());
        let mut transform = ResponseTransform::new("s", sink.clone());
        let out = run(&mut transform, vec![model_end(10, 5), model_end(7, 2)]);
        assert_eq!(
            out[1..],
            [ChatEvent::turn_break(), ChatEvent::turn_break()]
        );
        assert_eq!(sink.lines().len(), 1);
        assert!(sink.lines()[0].contains("Input: 17 tokens"));
        assert!(sink.lines()[0].contains("Output: 7 tokens"));

        let usage = transform.into_usage();
        assert_eq!(usage.total_input_tokens, 17);
        assert_eq!(usage.total_output_tokens, 7);
    }

    #[test]
    fn flush_logs_cost_summary_once() {
        let sink = Arc::new(RecordingSink::default());
        let mut transform = ResponseTransform::new("abc", sink.clone());
        run(&mut transform, vec![model_end(1000, 1000)]);
        transform.flush();
        assert_eq!(transform.complete(), None);
        assert_eq!(
            sink.lines(),
            vec![
                "[Token Usage] Session: abc | Input: 1000 tokens ($0.001100) | Output: 1000 tokens ($0.005500) | Total: 2000 tokens ($0.006600)"
                    .to_string()
            ]
        );
    }

    #[test]
    fn custom_pricing_is_used_for_summary() {
        let sink = Arc::new(RecordingSink::default());
        let mut transform =
            ResponseTransform::new("s", sink).pricing(Pricing::new(1.0, 2.0));
        transform
            .transform(model_end(500, 250))
            .expect("transform");
        let summary = transform.complete().expect("summary");
        assert!((summary.input_cost - 0.5).abs() < 1e-12);
        assert!((summary.output_cost - 0.5).abs() < 1e-12);
    }

    #[test]
    fn tool_start_maps_to_tool_event() {
        let sink = Arc::new(RecordingSink::default());
        let mut transform = ResponseTransform::new("s", sink);
        let item = RawTraceEvent::new(TOOL_START, json!({"input": {"input": {"query": "x"}}}))
            .named("search");
        assert_eq!(
            transform.transform(item).expect("transform"),
            Some(ChatEvent::ToolEvent {
                name: "search".into(),
                input: json!({"query": "x"}),
            })
        );
    }

    #[test]
    fn malformed_tool_start_fails_without_output() {
        let sink = Arc::new(RecordingSink::default());
        let mut transform = ResponseTransform::new("s", sink);
        let item = RawTraceEvent::new(TOOL_START, json!({})).named("search");
        assert!(matches!(
            transform.transform(item),
            Err(TransformError::MalformedPayload { .. })
        ));
    }

    #[test]
    fn unknown_kinds_are_ignored() {
        let sink = Arc::new(RecordingSink::default());
        let mut transform = ResponseTransform::new("s", sink);
        let item = RawTraceEvent::new("on_chain_end", json!({"output": {"usage_metadata": {"input_tokens": 99}}}));
        assert_eq!(transform.transform(item).expect("transform"), None);
        assert_eq!(transform.usage().total_input_tokens, 0);
    }

    #[test]
    fn sink_failure_is_swallowed() {
        let sink = Arc::new(RecordingSink::failing());
        let mut transform = ResponseTransform::new("s", sink.clone());
        let out = run(&mut transform, vec![text_delta("a")]);
        assert_eq!(out.len(), 2);
        assert_eq!(sink.lines().len(), 1);
    }

    #[test]
    fn borrowed_accumulator_aggregates_sequential_responses() {
        let sink: Arc<dyn LogSink> = Arc::new(RecordingSink::default());
        let mut usage = UsageAccumulator::new();

        let mut first = ResponseTransform::with_usage("turn-1", sink.clone(), &mut usage);
        run(&mut first, vec![model_end(10, 5)]);
        drop(first);

        let mut second = ResponseTransform::with_usage("turn-2", sink, &mut usage);
        run(&mut second, vec![model_end(7, 2)]);
        drop(second);

        assert_eq!(usage.total_input_tokens, 17);
        assert_eq!(usage.total_output_tokens, 7);
    }
}
