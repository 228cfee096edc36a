//! Processing sink abstraction.
//!
//! The consumer forwards every chunk to a `Recognizer` in order, then asks
//! for the aggregated result exactly once. The pipeline owns the recognizer
//! for the whole transfer; only the consumer thread touches it.

pub mod energy;
pub mod stub;

pub use energy::EnergyRecognizer;
pub use stub::StubRecognizer;

use crate::error::Result;
use crate::ipc::events::RecognitionResult;

/// Contract for recognition backends fed with raw PCM bytes.
pub trait Recognizer: Send {
    /// Accept the next chunk of raw audio bytes.
    ///
    /// Chunk boundaries are arbitrary; a sample may be split across two
    /// calls.
    fn accept(&mut self, bytes: &[u8]);

    /// Produce the aggregated result. Called once, after the last `accept`.
    ///
    /// # Errors
    /// Backend-specific failures, reported as `WavpipeError::Recognizer`.
    fn finalize(&mut self) -> Result<RecognitionResult>;
}

impl<R: Recognizer + ?Sized> Recognizer for Box<R> {
    fn accept(&mut self, bytes: &[u8]) {
        (**self).accept(bytes)
    }

    fn finalize(&mut self) -> Result<RecognitionResult> {
        (**self).finalize()
    }
}

/// Which built-in recognizer to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecognizerKind {
    #[default]
    Energy,
    Stub,
}

impl RecognizerKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "energy" | "vad" => Some(Self::Energy),
            "stub" | "echo" => Some(Self::Stub),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Energy => "energy",
            Self::Stub => "stub",
        }
    }

    /// Build the recognizer for 16-bit mono PCM at `sample_rate`.
    pub fn build(self, sample_rate: u32) -> Box<dyn Recognizer> {
        match self {
            Self::Energy => Box::new(EnergyRecognizer::with_default_vad(sample_rate)),
            Self::Stub => Box::new(StubRecognizer::new()),
        }
    }
}
