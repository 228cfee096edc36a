//! Producer role: source → fixed-size chunks → queue.
//!
//! ```text
//! loop {
//!     fill chunk from source (outside the lock)
//!     report progress          (outside the lock)
//!     if len > 0  → enqueue    (blocks while the ring is full)
//!     if short    → mark exhausted, stop
//! }
//! ```
//!
//! The exhaustion flag is raised on every exit path, including errors and
//! panics, so the consumer can never be left waiting.

use std::io::ErrorKind;

use tracing::{debug, info, warn};

use crate::{
    buffering::{chunk::ChunkSlot, AudioQueue},
    error::{Result, WavpipeError},
    progress::ProgressReporter,
    source::ByteSource,
};

/// What the producer did before it stopped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProducerReport {
    pub chunks: usize,
    pub bytes_read: u64,
}

/// Marks the queue exhausted when dropped.
struct ExhaustOnDrop<'a>(&'a AudioQueue);

impl Drop for ExhaustOnDrop<'_> {
    fn drop(&mut self) {
        self.0.mark_exhausted();
    }
}

struct Fill {
    len: usize,
    /// The source reported an error; stop after this chunk.
    failed: bool,
}

/// Read until `buf` is full or the source ends, like `fread`.
fn fill_chunk<S: ByteSource + ?Sized>(source: &mut S, buf: &mut [u8]) -> Fill {
    let mut len = 0;
    while len < buf.len() {
        match source.read(&mut buf[len..]) {
            Ok(0) => break,
            Ok(n) => len += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!("source read failed, treating as end of stream: {e}");
                return Fill { len, failed: true };
            }
        }
    }
    Fill { len, failed: false }
}

/// Stream `source` into `queue` until a short read.
///
/// # Errors
/// - `WavpipeError::Cancelled` if the pipeline was cancelled.
/// - `WavpipeError::ConsumerGone` if the consumer stopped early.
pub fn run<S, P>(queue: &AudioQueue, source: &mut S, progress: &mut P) -> Result<ProducerReport>
where
    S: ByteSource + ?Sized,
    P: ProgressReporter + ?Sized,
{
    let _exhaust = ExhaustOnDrop(queue);

    let chunk_capacity = queue.chunk_capacity();
    let total_bytes = source.declared_len();
    let mut slot = ChunkSlot::with_capacity(chunk_capacity);
    let mut report = ProducerReport::default();

    info!(total_bytes, chunk_capacity, "producer started");

    loop {
        if queue.is_cancelled() {
            return Err(WavpipeError::Cancelled);
        }

        let fill = fill_chunk(source, slot.buffer_mut());
        slot.set_len(fill.len);
        report.bytes_read += fill.len as u64;
        progress.report(report.bytes_read, total_bytes);

        if fill.len > 0 {
            queue.enqueue(&mut slot)?;
            report.chunks += 1;
            debug!(len = fill.len, chunks = report.chunks, "chunk enqueued");
        }

        if fill.len < chunk_capacity || fill.failed {
            break;
        }
    }

    queue.mark_exhausted();
    info!(
        chunks = report.chunks,
        bytes_read = report.bytes_read,
        "source exhausted"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffering::QueueDiagnostics;
    use crate::progress::NoProgress;
    use crate::source::StreamSource;
    use std::io::{self, Read};
    use std::sync::Arc;

    fn queue(capacity: usize, chunk: usize, expected: u64) -> AudioQueue {
        AudioQueue::new(capacity, chunk, expected, Arc::new(QueueDiagnostics::default())).unwrap()
    }

    /// Returns at most 3 bytes per read, then an error after `fail_after`.
    struct Trickle {
        data: Vec<u8>,
        pos: usize,
        fail_after: Option<usize>,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.fail_after.is_some_and(|limit| self.pos >= limit) {
                return Err(io::Error::new(io::ErrorKind::Other, "disk went away"));
            }
            let n = buf.len().min(3).min(self.data.len() - self.pos);
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    #[test]
    fn short_underlying_reads_still_fill_whole_chunks() {
        let q = queue(8, 10, 25);
        let mut src = StreamSource::new(
            Trickle {
                data: (0..25).collect(),
                pos: 0,
                fail_after: None,
            },
            25,
        );

        let report = run(&q, &mut src, &mut NoProgress).unwrap();
        assert_eq!(report, ProducerReport { chunks: 3, bytes_read: 25 });
        assert_eq!(q.len(), 3);
        assert!(q.is_exhausted());

        let mut out = ChunkSlot::with_capacity(10);
        let mut lens = Vec::new();
        while let Some(len) = q.dequeue(&mut out).unwrap() {
            lens.push(len);
        }
        assert_eq!(lens, vec![10, 10, 5]);
    }

    #[test]
    fn exact_multiple_ends_on_zero_length_read() {
        let q = queue(8, 4, 8);
        let mut src = StreamSource::from_bytes(vec![1; 8]);
        let mut calls = Vec::new();
        let mut progress = |c: u64, t: u64| calls.push((c, t));

        let report = run(&q, &mut src, &mut progress).unwrap();
        assert_eq!(report.chunks, 2);
        assert_eq!(q.len(), 2);
        // Two full reads plus the final zero-length read.
        assert_eq!(calls, vec![(4, 8), (8, 8), (8, 8)]);
    }

    #[test]
    fn read_error_ends_the_stream() {
        let q = queue(8, 4, 100);
        let mut src = StreamSource::new(
            Trickle {
                data: vec![5; 100],
                pos: 0,
                fail_after: Some(6),
            },
            100,
        );

        let report = run(&q, &mut src, &mut NoProgress).unwrap();
        // 4-byte chunk, then 3 bytes before the error.
        assert_eq!(report.bytes_read, 7);
        assert_eq!(report.chunks, 2);
        assert!(q.is_exhausted());
    }

    #[test]
    fn cancelled_queue_stops_producer_and_still_exhausts() {
        let q = queue(2, 4, 100);
        q.cancel();
        let mut src = StreamSource::from_bytes(vec![0; 100]);
        let err = run(&q, &mut src, &mut NoProgress).unwrap_err();
        assert!(matches!(err, WavpipeError::Cancelled));
        assert!(q.is_exhausted());
    }
}
