//! Bounded single-producer / single-consumer queue of audio chunks.
//!
//! A fixed ring of [`ChunkSlot`]s guarded by one `parking_lot::Mutex` and two
//! condition variables:
//!
//! ```text
//!  producer ──enqueue──► [ slot | slot | slot | ... ] ──dequeue──► consumer
//!     ▲   waits on not_full      (count <= N)      waits on not_empty   │
//!     └──────────────── notify_one(not_full) ◄──────────────────────────┘
//! ```
//!
//! Chunks move by swapping buffers with the caller, so the bytes are never
//! copied and the lock is never held while the caller does I/O. The
//! completion flag lives under the same mutex as the counters.

pub mod chunk;

use std::sync::{
    atomic::{AtomicU64, AtomicUsize, Ordering},
    Arc,
};

use parking_lot::{Condvar, Mutex};

use crate::error::{Result, WavpipeError};
use chunk::ChunkSlot;

/// Bytes per chunk read from the source.
pub const DEFAULT_CHUNK_SIZE: usize = 4000;

/// Number of chunk slots in the ring.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Transfer progress shared between the two roles.
///
/// Only ever read or written while holding the queue mutex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PipelineState {
    /// Set once by the producer when the source has no more data.
    pub source_exhausted: bool,
    /// Bytes the producer has handed to the queue so far.
    pub total_bytes_read: u64,
    /// Declared payload length of the source.
    pub total_bytes_expected: u64,
}

struct QueueState {
    slots: Vec<ChunkSlot>,
    read_index: usize,
    write_index: usize,
    count: usize,
    pipeline: PipelineState,
    cancelled: bool,
    consumer_closed: bool,
}

/// Counters updated by the queue, readable without taking its lock.
#[derive(Debug, Default)]
pub struct QueueDiagnostics {
    pub chunks_enqueued: AtomicUsize,
    pub chunks_dequeued: AtomicUsize,
    pub bytes_enqueued: AtomicU64,
    pub bytes_dequeued: AtomicU64,
    pub producer_full_waits: AtomicUsize,
    pub consumer_empty_waits: AtomicUsize,
    pub high_water: AtomicUsize,
}

impl QueueDiagnostics {
    pub fn reset(&self) {
        self.chunks_enqueued.store(0, Ordering::Relaxed);
        self.chunks_dequeued.store(0, Ordering::Relaxed);
        self.bytes_enqueued.store(0, Ordering::Relaxed);
        self.bytes_dequeued.store(0, Ordering::Relaxed);
        self.producer_full_waits.store(0, Ordering::Relaxed);
        self.consumer_empty_waits.store(0, Ordering::Relaxed);
        self.high_water.store(0, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            chunks_enqueued: self.chunks_enqueued.load(Ordering::Relaxed),
            chunks_dequeued: self.chunks_dequeued.load(Ordering::Relaxed),
            bytes_enqueued: self.bytes_enqueued.load(Ordering::Relaxed),
            bytes_dequeued: self.bytes_dequeued.load(Ordering::Relaxed),
            producer_full_waits: self.producer_full_waits.load(Ordering::Relaxed),
            consumer_empty_waits: self.consumer_empty_waits.load(Ordering::Relaxed),
            high_water: self.high_water.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiagnosticsSnapshot {
    pub chunks_enqueued: usize,
    pub chunks_dequeued: usize,
    pub bytes_enqueued: u64,
    pub bytes_dequeued: u64,
    /// Times the producer found the ring full and had to wait.
    pub producer_full_waits: usize,
    /// Times the consumer found the ring empty and had to wait.
    pub consumer_empty_waits: usize,
    /// Largest `count` ever observed.
    pub high_water: usize,
}

/// Fixed-capacity circular buffer of chunk slots.
pub struct AudioQueue {
    state: Mutex<QueueState>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: usize,
    chunk_capacity: usize,
    diagnostics: Arc<QueueDiagnostics>,
}

impl AudioQueue {
    /// Allocate `capacity` slots of `chunk_capacity` bytes each.
    ///
    /// # Errors
    /// `WavpipeError::InvalidConfig` if either size is zero.
    pub fn new(
        capacity: usize,
        chunk_capacity: usize,
        total_bytes_expected: u64,
        diagnostics: Arc<QueueDiagnostics>,
    ) -> Result<Self> {
        if capacity == 0 {
            return Err(WavpipeError::InvalidConfig(
                "queue capacity must be at least 1".into(),
            ));
        }
        if chunk_capacity == 0 {
            return Err(WavpipeError::InvalidConfig(
                "chunk size must be at least 1 byte".into(),
            ));
        }

        let slots = (0..capacity)
            .map(|_| ChunkSlot::with_capacity(chunk_capacity))
            .collect();

        Ok(Self {
            state: Mutex::new(QueueState {
                slots,
                read_index: 0,
                write_index: 0,
                count: 0,
                pipeline: PipelineState {
                    source_exhausted: false,
                    total_bytes_read: 0,
                    total_bytes_expected,
                },
                cancelled: false,
                consumer_closed: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity,
            chunk_capacity,
            diagnostics,
        })
    }

    /// Number of slots (N).
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes per slot (C).
    pub fn chunk_capacity(&self) -> usize {
        self.chunk_capacity
    }

    /// Number of chunks currently buffered.
    pub fn len(&self) -> usize {
        self.state.lock().count
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Consistent snapshot of the shared transfer state.
    pub fn pipeline_state(&self) -> PipelineState {
        self.state.lock().pipeline
    }

    pub fn is_exhausted(&self) -> bool {
        self.state.lock().pipeline.source_exhausted
    }

    pub fn total_bytes_read(&self) -> u64 {
        self.state.lock().pipeline.total_bytes_read
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.lock().cancelled
    }

    /// Hand a filled chunk to the queue, blocking while the ring is full.
    ///
    /// On success `chunk` holds a cleared buffer ready to be refilled. An
    /// empty chunk is not stored.
    ///
    /// # Errors
    /// - `WavpipeError::Cancelled` if the pipeline was cancelled.
    /// - `WavpipeError::ConsumerGone` if the consumer has shut down.
    pub fn enqueue(&self, chunk: &mut ChunkSlot) -> Result<()> {
        if chunk.is_empty() {
            return Ok(());
        }

        let mut state = self.state.lock();

        let mut waited = false;
        while state.count == self.capacity && !state.cancelled && !state.consumer_closed {
            if !waited {
                self.diagnostics
                    .producer_full_waits
                    .fetch_add(1, Ordering::Relaxed);
                waited = true;
            }
            self.not_full.wait(&mut state);
        }

        if state.cancelled {
            return Err(WavpipeError::Cancelled);
        }
        if state.consumer_closed {
            return Err(WavpipeError::ConsumerGone);
        }
        debug_assert!(
            !state.pipeline.source_exhausted,
            "enqueue after the source was marked exhausted"
        );

        let len = chunk.len();
        let index = state.write_index;
        state.slots[index].swap_with(chunk);
        chunk.clear();
        state.write_index = (index + 1) % self.capacity;
        state.count += 1;
        state.pipeline.total_bytes_read += len as u64;

        self.diagnostics
            .chunks_enqueued
            .fetch_add(1, Ordering::Relaxed);
        self.diagnostics
            .bytes_enqueued
            .fetch_add(len as u64, Ordering::Relaxed);
        self.diagnostics
            .high_water
            .fetch_max(state.count, Ordering::Relaxed);

        drop(state);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Take the oldest chunk, blocking while the ring is empty and the source
    /// is not yet exhausted.
    ///
    /// Returns `Ok(Some(len))` with the chunk swapped into `chunk`, or
    /// `Ok(None)` once the source is exhausted and every chunk was drained.
    ///
    /// # Errors
    /// `WavpipeError::Cancelled` if the pipeline was cancelled.
    pub fn dequeue(&self, chunk: &mut ChunkSlot) -> Result<Option<usize>> {
        let mut state = self.state.lock();

        let mut waited = false;
        while state.count == 0 && !state.pipeline.source_exhausted && !state.cancelled {
            if !waited {
                self.diagnostics
                    .consumer_empty_waits
                    .fetch_add(1, Ordering::Relaxed);
                waited = true;
            }
            self.not_empty.wait(&mut state);
        }

        if state.cancelled {
            return Err(WavpipeError::Cancelled);
        }
        if state.count == 0 {
            return Ok(None);
        }

        let index = state.read_index;
        chunk.swap_with(&mut state.slots[index]);
        state.slots[index].clear();
        state.read_index = (index + 1) % self.capacity;
        state.count -= 1;

        let len = chunk.len();
        self.diagnostics
            .chunks_dequeued
            .fetch_add(1, Ordering::Relaxed);
        self.diagnostics
            .bytes_dequeued
            .fetch_add(len as u64, Ordering::Relaxed);

        drop(state);
        self.not_full.notify_one();
        Ok(Some(len))
    }

    /// Record that the source has no more data and release a waiting consumer.
    ///
    /// Idempotent: the flag only ever goes from false to true.
    pub fn mark_exhausted(&self) {
        let mut state = self.state.lock();
        if state.pipeline.source_exhausted {
            return;
        }
        state.pipeline.source_exhausted = true;
        drop(state);
        self.not_empty.notify_all();
    }

    /// Stop both roles at their next suspension point.
    pub fn cancel(&self) {
        let mut state = self.state.lock();
        state.cancelled = true;
        drop(state);
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    /// Called when the consumer stops; a producer blocked on a full ring
    /// gets `ConsumerGone` instead of waiting forever.
    pub fn close_consumer(&self) {
        let mut state = self.state.lock();
        state.consumer_closed = true;
        drop(state);
        self.not_full.notify_all();
    }
}

impl std::fmt::Debug for AudioQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioQueue")
            .field("capacity", &self.capacity)
            .field("chunk_capacity", &self.chunk_capacity)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    fn queue(capacity: usize, chunk: usize) -> AudioQueue {
        AudioQueue::new(capacity, chunk, 0, Arc::new(QueueDiagnostics::default()))
            .expect("valid queue")
    }

    fn filled(chunk: usize, bytes: &[u8]) -> ChunkSlot {
        let mut slot = ChunkSlot::with_capacity(chunk);
        slot.buffer_mut()[..bytes.len()].copy_from_slice(bytes);
        slot.set_len(bytes.len());
        slot
    }

    #[test]
    fn zero_sizes_are_rejected() {
        let diag = Arc::new(QueueDiagnostics::default());
        assert!(matches!(
            AudioQueue::new(0, 16, 0, Arc::clone(&diag)),
            Err(WavpipeError::InvalidConfig(_))
        ));
        assert!(matches!(
            AudioQueue::new(4, 0, 0, diag),
            Err(WavpipeError::InvalidConfig(_))
        ));
    }

    #[test]
    fn fifo_order_survives_wrap_around() {
        let q = queue(3, 4);
        let mut out = ChunkSlot::with_capacity(4);

        for round in 0u8..5 {
            let mut a = filled(4, &[round, 1]);
            let mut b = filled(4, &[round, 2, 2]);
            q.enqueue(&mut a).unwrap();
            q.enqueue(&mut b).unwrap();
            assert!(a.is_empty() && b.is_empty());

            assert_eq!(q.dequeue(&mut out).unwrap(), Some(2));
            assert_eq!(out.as_bytes(), &[round, 1]);
            assert_eq!(q.dequeue(&mut out).unwrap(), Some(3));
            assert_eq!(out.as_bytes(), &[round, 2, 2]);
        }
        assert!(q.is_empty());
        assert_eq!(q.total_bytes_read(), 25);
    }

    #[test]
    fn empty_chunk_is_not_stored() {
        let q = queue(2, 4);
        let mut empty = ChunkSlot::with_capacity(4);
        q.enqueue(&mut empty).unwrap();
        assert_eq!(q.len(), 0);
    }

    #[test]
    fn drained_and_exhausted_returns_none_without_blocking() {
        let q = queue(2, 4);
        let mut chunk = filled(4, &[9, 9]);
        q.enqueue(&mut chunk).unwrap();
        q.mark_exhausted();

        let mut out = ChunkSlot::with_capacity(4);
        assert_eq!(q.dequeue(&mut out).unwrap(), Some(2));
        assert_eq!(q.dequeue(&mut out).unwrap(), None);
        assert_eq!(q.dequeue(&mut out).unwrap(), None);
    }

    #[test]
    fn mark_exhausted_is_idempotent() {
        let q = queue(1, 4);
        q.mark_exhausted();
        q.mark_exhausted();
        let state = q.pipeline_state();
        assert!(state.source_exhausted);
        assert_eq!(state.total_bytes_read, 0);
    }

    #[test]
    fn full_queue_blocks_producer_until_dequeue() {
        let diag = Arc::new(QueueDiagnostics::default());
        let q = AudioQueue::new(1, 4, 0, Arc::clone(&diag)).unwrap();
        let mut first = filled(4, &[1]);
        q.enqueue(&mut first).unwrap();

        thread::scope(|s| {
            let producer = s.spawn(|| {
                let mut second = filled(4, &[2]);
                q.enqueue(&mut second)
            });

            thread::sleep(Duration::from_millis(50));
            assert!(!producer.is_finished(), "producer must block on a full ring");
            assert_eq!(q.len(), 1);

            let mut out = ChunkSlot::with_capacity(4);
            assert_eq!(q.dequeue(&mut out).unwrap(), Some(1));
            assert_eq!(out.as_bytes(), &[1]);

            producer.join().unwrap().unwrap();
        });

        assert_eq!(q.len(), 1);
        assert_eq!(diag.snapshot().producer_full_waits, 1);
        assert_eq!(diag.snapshot().high_water, 1);
    }

    #[test]
    fn exhaustion_releases_waiting_consumer() {
        let q = queue(2, 4);
        thread::scope(|s| {
            let consumer = s.spawn(|| {
                let mut out = ChunkSlot::with_capacity(4);
                q.dequeue(&mut out)
            });
            thread::sleep(Duration::from_millis(30));
            q.mark_exhausted();
            assert_eq!(consumer.join().unwrap().unwrap(), None);
        });
    }

    #[test]
    fn cancel_releases_both_roles() {
        let q = queue(1, 4);
        let mut first = filled(4, &[1]);
        q.enqueue(&mut first).unwrap();

        thread::scope(|s| {
            let producer = s.spawn(|| {
                let mut second = filled(4, &[2]);
                q.enqueue(&mut second)
            });
            thread::sleep(Duration::from_millis(30));
            q.cancel();
            assert!(matches!(
                producer.join().unwrap(),
                Err(WavpipeError::Cancelled)
            ));
        });

        let mut out = ChunkSlot::with_capacity(4);
        assert!(matches!(q.dequeue(&mut out), Err(WavpipeError::Cancelled)));
    }

    #[test]
    fn closed_consumer_releases_blocked_producer() {
        let q = queue(1, 4);
        let mut first = filled(4, &[1]);
        q.enqueue(&mut first).unwrap();

        thread::scope(|s| {
            let producer = s.spawn(|| {
                let mut second = filled(4, &[2]);
                q.enqueue(&mut second)
            });
            thread::sleep(Duration::from_millis(30));
            q.close_consumer();
            assert!(matches!(
                producer.join().unwrap(),
                Err(WavpipeError::ConsumerGone)
            ));
        });
    }
}
