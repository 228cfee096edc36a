//! # wavpipe-core
//!
//! Streams a WAV file into a recognizer through a bounded producer/consumer
//! queue.
//!
//! ## Architecture
//!
//! ```text
//! ByteSource ─► producer thread ─► AudioQueue (N slots × C bytes) ─► consumer thread
//!                    │                  mutex + not_empty / not_full       │
//!              ProgressReporter                                  Recognizer::accept
//!                                                                          │
//!                                                   Recognizer::finalize (once)
//! ```
//!
//! The producer blocks when the ring is full (backpressure); the consumer
//! blocks when it is empty until the producer marks the source exhausted.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod buffering;
pub mod engine;
pub mod error;
pub mod ipc;
pub mod progress;
pub mod recognizer;
pub mod source;
pub mod vad;

// Convenience re-exports for downstream crates
pub use buffering::{chunk::ChunkSlot, AudioQueue, DiagnosticsSnapshot, PipelineState};
pub use engine::{Pipeline, PipelineCanceller, PipelineConfig, ProducerReport};
pub use error::{Result, WavpipeError};
pub use ipc::events::{
    PipelineStatus, PipelineStatusEvent, ProgressEvent, RecognitionResult, SpeechSpan,
};
pub use progress::{ChannelProgress, NoProgress, ProgressReporter};
pub use recognizer::{EnergyRecognizer, Recognizer, RecognizerKind, StubRecognizer};
pub use source::{ByteSource, StreamSource, WavFileSource};
