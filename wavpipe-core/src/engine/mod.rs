//! `Pipeline`: drives one producer/consumer transfer.
//!
//! ## Lifecycle
//!
//! ```text
//! Pipeline::new()
//!     └─► run()     → queue allocated, both roles spawned, status = Running
//!         ├─► producer joined cleanly                  status = Draining
//!         └─► consumer joined, result returned         status = Done
//! ```
//!
//! Any setup error, worker failure or cancellation ends in `Failed`. A
//! pipeline is single-use: calling `run()` again returns `AlreadyStarted`.
//!
//! ## Threading
//!
//! The producer and consumer run on two named scoped threads that borrow one
//! `AudioQueue`. The driver joins both before it drops the queue, the source
//! and the recognizer, so no buffer outlives its users.

pub mod consumer;
pub mod producer;

use std::path::Path;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{error, info, info_span, warn};

use crate::{
    buffering::{
        AudioQueue, DiagnosticsSnapshot, QueueDiagnostics, DEFAULT_CHUNK_SIZE,
        DEFAULT_QUEUE_CAPACITY,
    },
    error::{Result, WavpipeError},
    ipc::events::{PipelineStatus, PipelineStatusEvent, RecognitionResult},
    progress::ProgressReporter,
    recognizer::Recognizer,
    source::{ByteSource, WavFileSource, WAV_HEADER_BYTES},
};

pub use producer::ProducerReport;

/// Broadcast channel capacity for status events.
const STATUS_BROADCAST_CAP: usize = 16;

/// Configuration for a `Pipeline`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Bytes per chunk (C). Default: 4000.
    pub chunk_size: usize,
    /// Number of slots in the ring (N). Default: 100.
    pub queue_capacity: usize,
    /// Header bytes skipped before streaming a WAV file. Default: 44.
    pub header_bytes: u64,
    /// Sample rate the recognizer expects (Hz). Default: 16000.
    pub sample_rate: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            header_bytes: WAV_HEADER_BYTES,
            sample_rate: 16_000,
        }
    }
}

impl PipelineConfig {
    /// # Errors
    /// `WavpipeError::InvalidConfig` for zero sizes.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(WavpipeError::InvalidConfig("chunk_size must be > 0".into()));
        }
        if self.queue_capacity == 0 {
            return Err(WavpipeError::InvalidConfig(
                "queue_capacity must be > 0".into(),
            ));
        }
        if self.sample_rate == 0 {
            return Err(WavpipeError::InvalidConfig("sample_rate must be > 0".into()));
        }
        Ok(())
    }
}

#[derive(Default)]
struct CancelSlot {
    requested: bool,
    queue: Option<Arc<AudioQueue>>,
}

/// Cloneable handle that stops a running (or not yet started) pipeline.
#[derive(Clone, Default)]
pub struct PipelineCanceller {
    inner: Arc<Mutex<CancelSlot>>,
}

impl PipelineCanceller {
    /// Wake both roles and make them stop at their next suspension point.
    pub fn cancel(&self) {
        let mut slot = self.inner.lock();
        slot.requested = true;
        if let Some(queue) = slot.queue.as_ref() {
            queue.cancel();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.lock().requested
    }

    fn attach(&self, queue: &Arc<AudioQueue>) {
        let mut slot = self.inner.lock();
        if slot.requested {
            queue.cancel();
        }
        slot.queue = Some(Arc::clone(queue));
    }

    fn detach(&self) {
        self.inner.lock().queue = None;
    }
}

impl std::fmt::Debug for PipelineCanceller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineCanceller")
            .field("requested", &self.is_cancelled())
            .finish()
    }
}

/// Single-use driver for one source → recognizer transfer.
///
/// `Pipeline` is `Send + Sync`; share it behind an `Arc` to observe status
/// or cancel from another thread while `run()` blocks.
pub struct Pipeline {
    config: PipelineConfig,
    /// Set by the first `run()`; never cleared.
    started: AtomicBool,
    status: Mutex<PipelineStatus>,
    status_tx: broadcast::Sender<PipelineStatusEvent>,
    diagnostics: Arc<QueueDiagnostics>,
    canceller: PipelineCanceller,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        let (status_tx, _) = broadcast::channel(STATUS_BROADCAST_CAP);
        Self {
            config,
            started: AtomicBool::new(false),
            status: Mutex::new(PipelineStatus::Idle),
            status_tx,
            diagnostics: Arc::new(QueueDiagnostics::default()),
            canceller: PipelineCanceller::default(),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Current status (snapshot).
    pub fn status(&self) -> PipelineStatus {
        *self.status.lock()
    }

    /// Subscribe to status transitions.
    pub fn subscribe_status(&self) -> broadcast::Receiver<PipelineStatusEvent> {
        self.status_tx.subscribe()
    }

    pub fn canceller(&self) -> PipelineCanceller {
        self.canceller.clone()
    }

    /// Queue counters for observability.
    pub fn diagnostics_snapshot(&self) -> DiagnosticsSnapshot {
        self.diagnostics.snapshot()
    }

    /// Open the WAV file at `path` and stream it through `recognizer`.
    ///
    /// # Errors
    /// `WavpipeError::SourceOpen` before anything starts if the file cannot
    /// be opened; otherwise whatever `run()` returns.
    pub fn run_file<R, P>(
        &self,
        path: impl AsRef<Path>,
        recognizer: R,
        progress: P,
    ) -> Result<RecognitionResult>
    where
        R: Recognizer,
        P: ProgressReporter,
    {
        if self.started.load(Ordering::SeqCst) {
            return Err(WavpipeError::AlreadyStarted);
        }
        let source = match WavFileSource::open(path, self.config.header_bytes) {
            Ok(s) => s,
            Err(e) => {
                if !self.started.swap(true, Ordering::SeqCst) {
                    self.set_status(PipelineStatus::Failed, Some(e.to_string()));
                }
                return Err(e);
            }
        };
        self.run(source, recognizer, progress)
    }

    /// Stream `source` into `recognizer` and return its final result.
    ///
    /// Blocks until both roles have finished. `source`, `recognizer` and
    /// `progress` are dropped before this returns.
    ///
    /// # Errors
    /// - `WavpipeError::AlreadyStarted` if this pipeline already ran.
    /// - `WavpipeError::InvalidConfig` / `WavpipeError::ThreadSpawn` on setup.
    /// - `WavpipeError::Cancelled` if cancelled.
    /// - `WavpipeError::WorkerPanicked` if either role panicked.
    /// - Any error returned by `recognizer.finalize()`.
    pub fn run<S, R, P>(&self, source: S, recognizer: R, progress: P) -> Result<RecognitionResult>
    where
        S: ByteSource,
        R: Recognizer,
        P: ProgressReporter,
    {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(WavpipeError::AlreadyStarted);
        }

        let queue = match self.setup(source.declared_len()) {
            Ok(q) => q,
            Err(e) => {
                self.set_status(PipelineStatus::Failed, Some(e.to_string()));
                return Err(e);
            }
        };

        self.set_status(PipelineStatus::Running, None);
        info!(
            chunk_size = self.config.chunk_size,
            queue_capacity = self.config.queue_capacity,
            total_bytes = source.declared_len(),
            "pipeline started"
        );

        self.canceller.attach(&queue);
        let outcome = self.drive(&queue, source, recognizer, progress);
        self.canceller.detach();
        drop(queue);

        match &outcome {
            Ok(result) => {
                let snapshot = self.diagnostics.snapshot();
                info!(
                    bytes = result.bytes_accepted,
                    chunks = snapshot.chunks_dequeued,
                    producer_full_waits = snapshot.producer_full_waits,
                    high_water = snapshot.high_water,
                    "pipeline done"
                );
                self.set_status(PipelineStatus::Done, None);
            }
            Err(e) => {
                error!("pipeline failed: {e}");
                self.set_status(PipelineStatus::Failed, Some(e.to_string()));
            }
        }
        outcome
    }

    // ── Internal helpers ─────────────────────────────────────────────────────

    fn setup(&self, total_bytes_expected: u64) -> Result<Arc<AudioQueue>> {
        self.config.validate()?;
        self.diagnostics.reset();
        let queue = AudioQueue::new(
            self.config.queue_capacity,
            self.config.chunk_size,
            total_bytes_expected,
            Arc::clone(&self.diagnostics),
        )?;
        Ok(Arc::new(queue))
    }

    fn drive<S, R, P>(
        &self,
        queue: &AudioQueue,
        mut source: S,
        mut recognizer: R,
        mut progress: P,
    ) -> Result<RecognitionResult>
    where
        S: ByteSource,
        R: Recognizer,
        P: ProgressReporter,
    {
        let (produced, consumed) = thread::scope(|s| -> Result<_> {
            let producer = thread::Builder::new()
                .name("wavpipe-producer".into())
                .spawn_scoped(s, || {
                    let _span = info_span!("producer").entered();
                    producer::run(queue, &mut source, &mut progress)
                })
                .map_err(|e| {
                    queue.cancel();
                    WavpipeError::ThreadSpawn(e)
                })?;

            let consumer = match thread::Builder::new()
                .name("wavpipe-consumer".into())
                .spawn_scoped(s, || {
                    let _span = info_span!("consumer").entered();
                    consumer::run(queue, &mut recognizer)
                }) {
                Ok(handle) => handle,
                Err(e) => {
                    queue.cancel();
                    let _ = producer.join();
                    return Err(WavpipeError::ThreadSpawn(e));
                }
            };

            let produced = producer.join();
            if matches!(produced, Ok(Ok(_))) {
                self.set_status(PipelineStatus::Draining, None);
            }
            let consumed = consumer.join();
            Ok((produced, consumed))
        })?;

        let result = match consumed {
            Ok(result) => result?,
            Err(_) => return Err(WavpipeError::WorkerPanicked("consumer")),
        };

        match produced {
            Ok(Ok(report)) => {
                if report.bytes_read != result.bytes_accepted {
                    warn!(
                        read = report.bytes_read,
                        accepted = result.bytes_accepted,
                        "recognizer byte count differs from bytes read"
                    );
                }
                Ok(result)
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(WavpipeError::WorkerPanicked("producer")),
        }
    }

    fn set_status(&self, new_status: PipelineStatus, detail: Option<String>) {
        *self.status.lock() = new_status;
        let _ = self.status_tx.send(PipelineStatusEvent {
            status: new_status,
            detail,
        });
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;
    use crate::recognizer::StubRecognizer;
    use crate::source::StreamSource;

    fn small_config() -> PipelineConfig {
        PipelineConfig {
            chunk_size: 8,
            queue_capacity: 2,
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn default_config_matches_wav_streaming_constants() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.chunk_size, 4000);
        assert_eq!(cfg.queue_capacity, 100);
        assert_eq!(cfg.header_bytes, 44);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn invalid_config_fails_before_start() {
        let pipeline = Pipeline::new(PipelineConfig {
            queue_capacity: 0,
            ..PipelineConfig::default()
        });
        let err = pipeline
            .run(StreamSource::from_bytes(vec![1; 10]), StubRecognizer::new(), NoProgress)
            .unwrap_err();
        assert!(err.is_setup());
        assert_eq!(pipeline.status(), PipelineStatus::Failed);
        assert_eq!(pipeline.diagnostics_snapshot().chunks_enqueued, 0);
    }

    #[test]
    fn status_walks_running_draining_done() {
        let pipeline = Pipeline::new(small_config());
        let mut rx = pipeline.subscribe_status();

        let result = pipeline
            .run(StreamSource::from_bytes(vec![3; 20]), StubRecognizer::new(), NoProgress)
            .unwrap();
        assert_eq!(result.bytes_accepted, 20);
        assert_eq!(result.chunks_accepted, 3);

        let seen: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|e| e.status)
            .collect();
        assert_eq!(
            seen,
            vec![
                PipelineStatus::Running,
                PipelineStatus::Draining,
                PipelineStatus::Done
            ]
        );
    }

    #[test]
    fn second_run_is_rejected() {
        let pipeline = Pipeline::new(small_config());
        pipeline
            .run(StreamSource::from_bytes(vec![]), StubRecognizer::new(), NoProgress)
            .unwrap();
        let err = pipeline
            .run(StreamSource::from_bytes(vec![1]), StubRecognizer::new(), NoProgress)
            .unwrap_err();
        assert!(matches!(err, WavpipeError::AlreadyStarted));
        assert_eq!(pipeline.status(), PipelineStatus::Done);
    }

    #[test]
    fn cancel_before_run_fails_fast_without_draining() {
        let pipeline = Pipeline::new(small_config());
        let mut rx = pipeline.subscribe_status();
        pipeline.canceller().cancel();
        let err = pipeline
            .run(StreamSource::from_bytes(vec![1; 64]), StubRecognizer::new(), NoProgress)
            .unwrap_err();
        assert!(matches!(err, WavpipeError::Cancelled));
        assert_eq!(pipeline.status(), PipelineStatus::Failed);

        let seen: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|e| e.status)
            .collect();
        assert_eq!(seen, vec![PipelineStatus::Running, PipelineStatus::Failed]);
    }

    #[test]
    fn missing_file_fails_without_starting() {
        let pipeline = Pipeline::new(PipelineConfig::default());
        let err = pipeline
            .run_file("/no/such/file.wav", StubRecognizer::new(), NoProgress)
            .unwrap_err();
        assert!(matches!(err, WavpipeError::SourceOpen { .. }));
        assert_eq!(pipeline.status(), PipelineStatus::Failed);
    }
}
