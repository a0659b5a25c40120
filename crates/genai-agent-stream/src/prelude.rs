//! Common imports for driving a response stream.
pub use crate::{
    ChatEvent, CostSummary, LogSink, Pricing, RawTraceEvent, ResponseStream, ResponseTransform,
    StreamTransform, TracingSink, TransformConfig, TransformError, TransformStreamExt, Transcript,
    UsageAccumulator, spawn_response_stream,
};
