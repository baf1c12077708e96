//! Bridge between blocking grammar code and async output streams
//!
//! The worker runs on the blocking pool and is started on the first poll of
//! the returned stream. Items travel through a bounded channel, so a slow
//! consumer stalls the worker at `blocking_send`. Dropping the stream closes
//! the channel; the worker's next send fails and it returns, dropping
//! whatever source it owns.

use crate::error::{ConversionError, ConversionResult};
use futures::stream::{self, BoxStream, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Sending half handed to a worker
pub type PumpSink<T> = mpsc::Sender<ConversionResult<T>>;

enum PumpState<T, F> {
    Idle(F),
    Running(mpsc::Receiver<ConversionResult<T>>, JoinHandle<()>),
    Done,
}

/// Run `work` on the blocking pool once the stream is first polled.
///
/// The stream ends after the first `Err` item. A worker panic shows up as
/// [`ConversionError::Internal`] instead of a clean end of stream.
pub fn blocking_stream<T, F>(capacity: usize, work: F) -> BoxStream<'static, ConversionResult<T>>
where
    T: Send + 'static,
    F: FnOnce(PumpSink<T>) + Send + 'static,
{
    let capacity = capacity.max(1);
    stream::unfold(PumpState::Idle(work), move |state| async move {
        let (mut receiver, worker) = match state {
            PumpState::Idle(work) => {
                let (sink, receiver) = mpsc::channel(capacity);
                let worker = tokio::task::spawn_blocking(move || work(sink));
                (receiver, worker)
            }
            PumpState::Running(receiver, worker) => (receiver, worker),
            PumpState::Done => return None,
        };

        match receiver.recv().await {
            Some(Ok(item)) => Some((Ok(item), PumpState::Running(receiver, worker))),
            Some(Err(error)) => Some((Err(error), PumpState::Done)),
            None => match worker.await {
                Ok(()) => None,
                Err(join_error) => {
                    tracing::error!(error = %join_error, "conversion worker did not finish");
                    Some((
                        Err(ConversionError::internal(format!(
                            "conversion worker failed: {join_error}"
                        ))),
                        PumpState::Done,
                    ))
                }
            },
        }
    })
    .boxed()
}

/// Send one item; `false` once the consumer has gone away.
pub fn emit<T>(sink: &PumpSink<T>, item: ConversionResult<T>) -> bool {
    sink.blocking_send(item).is_ok()
}
