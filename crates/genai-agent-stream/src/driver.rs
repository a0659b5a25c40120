//! Drives a [`StreamTransform`] over an async input stream.
//!
//! [`TransformStreamExt::through`] adapts a stream in place.
//! [`spawn_response_stream`] runs a [`ResponseTransform`] on its own task and
//! hands back a [`ResponseStream`] that can be cancelled.

use std::pin::Pin;

use futures::stream::{self, Stream, StreamExt as _};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{Instrument as _, debug, info_span};

use crate::chat::ChatEvent;
use crate::errors::TransformError;
use crate::trace::RawTraceEvent;
use crate::transform::{ResponseTransform, StreamTransform};
use crate::usage::CostSummary;

/// Adapter for running a stream of fallible items through a [`StreamTransform`].
pub trait TransformStreamExt<I>: Stream<Item = Result<I, TransformError>> + Sized {
    /// Yields the transform's start output, then one output per qualifying
    /// item, then flushes once the input ends.
    ///
    /// The first error (upstream or from the transform) is yielded and ends
    /// the stream without flushing. The returned stream is fused.
    fn through<T>(self, transform: T) -> impl Stream<Item = Result<T::Output, TransformError>>
    where
        T: StreamTransform<Input = I>;
}

impl<I, S> TransformStreamExt<I> for S
where
    S: Stream<Item = Result<I, TransformError>> + Sized,
{
    fn through<T>(self, transform: T) -> impl Stream<Item = Result<T::Output, TransformError>>
    where
        T: StreamTransform<Input = I>,
    {
        drive(self, transform)
    }
}

enum Phase {
    Start,
    Items,
    Done,
}

fn drive<S, T>(input: S, transform: T) -> impl Stream<Item = Result<T::Output, TransformError>>
where
    S: Stream<Item = Result<T::Input, TransformError>>,
    T: StreamTransform,
{
    struct State<S, T> {
        input: Pin<Box<S>>,
        transform: T,
        phase: Phase,
    }

    stream::unfold(
        State {
            input: Box::pin(input),
            transform,
            phase: Phase::Start,
        },
        |mut state| async move {
            loop {
                match state.phase {
                    Phase::Start => {
                        state.phase = Phase::Items;
                        if let Some(event) = state.transform.start() {
                            return Some((Ok(event), state));
                        }
                    }
                    Phase::Items => match state.input.next().await {
                        Some(Ok(item)) => match state.transform.transform(item) {
                            Ok(Some(event)) => return Some((Ok(event), state)),
                            Ok(None) => continue,
                            Err(err) => {
                                state.phase = Phase::Done;
                                return Some((Err(err), state));
                            }
                        },
                        Some(Err(err)) => {
                            state.phase = Phase::Done;
                            return Some((Err(err), state));
                        }
                        None => {
                            state.transform.flush();
                            return None;
                        }
                    },
                    Phase::Done => return None,
                }
            }
        },
    )
    .fuse()
}

/// Handle used to request cancellation of a spawned response stream.
#[derive(Clone)]
pub struct AbortHandle {
    tx: watch::Sender<bool>,
}

impl AbortHandle {
    /// Requests cancellation.
    ///
    /// Cancellation is best-effort: events already buffered are still
    /// delivered, followed by `TransformError::Cancelled`. The usage summary
    /// is not logged.
    pub fn abort(&self) {
        let _ = self.tx.send(true);
    }
}

/// Consumer side of a spawned response transform.
pub struct ResponseStream {
    session_id: String,
    rx: mpsc::Receiver<Result<ChatEvent, TransformError>>,
    final_rx: oneshot::Receiver<Result<CostSummary, TransformError>>,
    abort_handle: AbortHandle,
}

impl ResponseStream {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Returns a handle that can cancel the stream.
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort_handle.clone()
    }

    /// Waits for the next chat event.
    ///
    /// Returns `None` once the stream has completed or failed.
    pub async fn next_event(&mut self) -> Option<Result<ChatEvent, TransformError>> {
        self.rx.recv().await
    }

    /// Drains remaining events and returns the response's cost summary.
    ///
    /// Safe to call after consuming events manually with `next_event()`.
    pub async fn finish(mut self) -> Result<CostSummary, TransformError> {
        while self.rx.recv().await.is_some() {}
        match self.final_rx.await {
            Ok(result) => result,
            Err(_) => Err(TransformError::protocol_msg(format!(
                "transform task ended without final result (session={})",
                self.session_id
            ))),
        }
    }
}

/// Runs `transform` over `input` on a new tokio task.
///
/// `capacity` bounds the number of chat events buffered ahead of the consumer
/// and must be greater than zero.
pub fn spawn_response_stream<S>(
    transform: ResponseTransform,
    input: S,
    capacity: usize,
) -> Result<ResponseStream, TransformError>
where
    S: Stream<Item = Result<RawTraceEvent, TransformError>> + Send + 'static,
{
    if capacity == 0 {
        return Err(TransformError::protocol_msg(
            "stream buffer capacity must be greater than 0",
        ));
    }
    let (tx, rx) = mpsc::channel(capacity);
    let (final_tx, final_rx) = oneshot::channel();
    let (abort_tx, abort_rx) = watch::channel(false);

    let session_id = transform.session_id().to_string();
    let span = info_span!("response", session_id = %session_id);
    tokio::spawn(run_task(transform, input, tx, final_tx, abort_rx).instrument(span));

    Ok(ResponseStream {
        session_id,
        rx,
        final_rx,
        abort_handle: AbortHandle { tx: abort_tx },
    })
}

async fn run_task<S>(
    mut transform: ResponseTransform,
    input: S,
    tx: mpsc::Sender<Result<ChatEvent, TransformError>>,
    final_tx: oneshot::Sender<Result<CostSummary, TransformError>>,
    mut abort_rx: watch::Receiver<bool>,
) where
    S: Stream<Item = Result<RawTraceEvent, TransformError>> + Send + 'static,
{
    let session_id = transform.session_id().to_string();

    if let Some(started) = transform.start()
        && !send_event(&tx, Ok(started)).await
    {
        let _ = final_tx.send(Err(TransformError::protocol_msg(
            "response stream receiver dropped before ResponseEvent",
        )));
        return;
    }

    let mut input = Box::pin(input);
    let mut abort_open = true;
    loop {
        tokio::select! {
            biased;
            changed = abort_rx.changed(), if abort_open => {
                match changed {
                    Ok(()) if *abort_rx.borrow() => {
                        debug!(session_id = %session_id, "response stream cancelled");
                        fail(&tx, final_tx, TransformError::Cancelled).await;
                        return;
                    }
                    Ok(()) => {}
                    Err(_) => abort_open = false,
                }
            }
            _ = tx.closed() => {
                debug!(session_id = %session_id, "response stream receiver dropped");
                return;
            }
            next = input.next() => {
                match next {
                    Some(Ok(item)) => match transform.transform(item) {
                        Ok(Some(event)) => {
                            if !send_event(&tx, Ok(event)).await {
                                let _ = final_tx.send(Err(TransformError::protocol_msg(
                                    "response stream receiver dropped during output",
                                )));
                                return;
                            }
                        }
                        Ok(None) => {}
                        Err(err) => {
                            debug!(session_id = %session_id, error = %err, "trace event rejected");
                            fail(&tx, final_tx, err).await;
                            return;
                        }
                    },
                    Some(Err(err)) => {
                        debug!(session_id = %session_id, error = %err, "upstream trace failed");
                        fail(&tx, final_tx, err).await;
                        return;
                    }
                    None => {
                        let result = transform.complete().ok_or_else(|| {
                            TransformError::protocol_msg("response stream flushed twice")
                        });
                        let _ = final_tx.send(result);
                        return;
                    }
                }
            }
        }
    }
}

async fn fail(
    tx: &mpsc::Sender<Result<ChatEvent, TransformError>>,
    final_tx: oneshot::Sender<Result<CostSummary, TransformError>>,
    err: TransformError,
) {
    let _ = send_event(tx, Err(err.clone())).await;
    let _ = final_tx.send(Err(err));
}

async fn send_event(
    tx: &mpsc::Sender<Result<ChatEvent, TransformError>>,
    event: Result<ChatEvent, TransformError>,
) -> bool {
    tx.send(event).await.is_ok()
}
