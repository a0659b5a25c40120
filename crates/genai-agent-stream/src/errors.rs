/// Errors that end a response stream.
///
/// Every variant is terminal: once the driver yields one, no further chat
/// events follow and the usage summary is not logged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransformError {
    /// A recognized trace event did not have the payload shape the producer
    /// contract promises.
    #[error("malformed {kind} payload: {message}")]
    MalformedPayload { kind: String, message: String },
    /// The upstream producer failed before the trace completed.
    #[error("upstream error: {0}")]
    Upstream(String),
    /// The stream was cancelled by the caller.
    #[error("response stream cancelled")]
    Cancelled,
    /// Internal driver misuse or invariant violation.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl TransformError {
    pub(crate) fn malformed(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedPayload {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Wraps any upstream failure.
    pub fn upstream(err: impl std::fmt::Display) -> Self {
        Self::Upstream(err.to_string())
    }

    pub(crate) fn protocol_msg(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }
}

/// Failure reported by a [`LogSink`](crate::sink::LogSink).
///
/// Sink failures never escape the transform; they are recorded and dropped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("log sink failed: {0}")]
pub struct SinkError(pub String);
