use crate::errors::SinkError;

/// Destination for the transform's info-level log lines.
///
/// Implementations may fail; the transform records the failure and carries on.
pub trait LogSink: Send + Sync {
    fn info(&self, message: &str) -> Result<(), SinkError>;
}

/// Forwards log lines to `tracing` at info level.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn info(&self, message: &str) -> Result<(), SinkError> {
        tracing::info!("{message}");
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::*;

    /// Keeps every line; optionally fails every call after recording it.
    #[derive(Default)]
    pub(crate) struct RecordingSink {
        lines: Mutex<Vec<String>>,
        fail: bool,
    }

    impl RecordingSink {
        pub(crate) fn failing() -> Self {
            Self {
                lines: Mutex::new(Vec::new()),
                fail: true,
            }
        }

        pub(crate) fn lines(&self) -> Vec<String> {
            self.lines.lock().expect("sink lock").clone()
        }
    }

    impl LogSink for RecordingSink {
        fn info(&self, message: &str) -> Result<(), SinkError> {
            self.lines.lock().expect("sink lock").push(message.to_string());
            if self.fail {
                return Err(SinkError("disk full".into()));
            }
            Ok(())
        }
    }
}
