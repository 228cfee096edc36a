//! Consumer role: queue → recognizer, then one `finalize`.

use tracing::{debug, info};

use crate::{
    buffering::{chunk::ChunkSlot, AudioQueue},
    error::Result,
    ipc::events::RecognitionResult,
    recognizer::Recognizer,
};

/// Closes the consumer side when dropped so a blocked producer is released.
struct CloseOnDrop<'a>(&'a AudioQueue);

impl Drop for CloseOnDrop<'_> {
    fn drop(&mut self) {
        self.0.close_consumer();
    }
}

/// Forward every queued chunk to `recognizer` in FIFO order until the source
/// is exhausted and the ring is empty, then finalize.
///
/// # Errors
/// - `WavpipeError::Cancelled` if the pipeline was cancelled (no finalize).
/// - Whatever `recognizer.finalize()` returns.
pub fn run<R>(queue: &AudioQueue, recognizer: &mut R) -> Result<RecognitionResult>
where
    R: Recognizer + ?Sized,
{
    let _close = CloseOnDrop(queue);
    let mut slot = ChunkSlot::with_capacity(queue.chunk_capacity());
    let mut chunks = 0u64;
    let mut bytes = 0u64;

    while let Some(len) = queue.dequeue(&mut slot)? {
        recognizer.accept(slot.as_bytes());
        chunks += 1;
        bytes += len as u64;
        debug!(len, chunks, "chunk forwarded");
    }

    info!(chunks, bytes, "queue drained, finalizing recognizer");
    recognizer.finalize()
}
